//! Persisted entity shapes. Field names are camelCase in the store.

use serde::{Deserialize, Serialize};

pub const ASSIGNMENT_DOCUMENT_TYPE: &str = "ASSIGNMENT";
pub const CASE_APPOINTMENT_DOCUMENT_TYPE: &str = "CASE_APPOINTMENT";
pub const SYNCED_CASE_DOCUMENT_TYPE: &str = "SYNCED_CASE";
pub const TRUSTEE_DOCUMENT_TYPE: &str = "TRUSTEE";

pub(crate) fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub document_type: String,
    pub case_id: String,
    pub user_id: String,
    pub name: String,
    pub role: String,
    pub assigned_on: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unassigned_on: Option<String>,
    pub updated_on: String,
    pub updated_by: String,
}

impl CaseAssignment {
    pub fn new(
        case_id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
        updated_by: impl Into<String>,
    ) -> Self {
        let now = now_iso();
        Self {
            id: None,
            document_type: ASSIGNMENT_DOCUMENT_TYPE.to_string(),
            case_id: case_id.into(),
            user_id: user_id.into(),
            name: name.into(),
            role: role.into(),
            assigned_on: now.clone(),
            unassigned_on: None,
            updated_on: now,
            updated_by: updated_by.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Transfer,
    Consolidation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationMember {
    pub case_id: String,
    pub case_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationOrder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub order_type: OrderType,
    pub case_id: String,
    pub consolidation_id: String,
    pub consolidation_type: String,
    pub court_division_code: String,
    pub status: OrderStatus,
    pub order_date: String,
    #[serde(default)]
    pub member_cases: Vec<ConsolidationMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Watermark record, one per sync stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub document_type: String,
    pub tx_id: String,
}

impl RuntimeState {
    pub fn new(stream: impl Into<String>, tx_id: impl Into<String>) -> Self {
        Self { id: None, document_type: stream.into(), tx_id: tx_id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trustee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub document_type: String,
    pub trustee_id: String,
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_truid: Option<String>,
    pub updated_on: String,
}

impl Trustee {
    pub fn new(trustee_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            document_type: TRUSTEE_DOCUMENT_TYPE.to_string(),
            trustee_id: trustee_id.into(),
            name: name.into(),
            status: "active".to_string(),
            legacy_truid: None,
            updated_on: now_iso(),
        }
    }
}

/// One trustee's tenure on a case. At most one per case is open, meaning
/// it has no `unassignedOn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseAppointment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub document_type: String,
    pub case_id: String,
    pub trustee_id: String,
    pub assigned_on: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unassigned_on: Option<String>,
    pub updated_on: String,
    pub updated_by: String,
}

impl CaseAppointment {
    pub fn new(case_id: impl Into<String>, trustee_id: impl Into<String>, updated_by: impl Into<String>) -> Self {
        let now = now_iso();
        Self {
            id: None,
            document_type: CASE_APPOINTMENT_DOCUMENT_TYPE.to_string(),
            case_id: case_id.into(),
            trustee_id: trustee_id.into(),
            assigned_on: now.clone(),
            unassigned_on: None,
            updated_on: now,
            updated_by: updated_by.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.unassigned_on.is_none()
    }
}

/// Case record synchronized from the legacy source; the target of trustee
/// linkage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub document_type: String,
    pub case_id: String,
    pub case_title: String,
    pub court_division_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trustee_id: Option<String>,
}

impl SyncedCase {
    pub fn new(
        case_id: impl Into<String>,
        case_title: impl Into<String>,
        court_division_code: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            document_type: SYNCED_CASE_DOCUMENT_TYPE.to_string(),
            case_id: case_id.into(),
            case_title: case_title.into(),
            court_division_code: court_division_code.into(),
            trustee_id: None,
        }
    }
}
