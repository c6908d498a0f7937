//! Event records produced by discovery and annotated by matching.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncEventType {
    Migration,
    TrusteeAppointment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MismatchReason {
    NoTrusteeMatch,
    MultipleTrusteesMatch,
    CaseNotFound,
    /// The legacy row could not be decoded into an appointment.
    InvalidSourceRow,
    /// The store failed while matching or applying the event.
    StoreError,
}

impl std::fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoTrusteeMatch => "NO_TRUSTEE_MATCH",
            Self::MultipleTrusteesMatch => "MULTIPLE_TRUSTEES_MATCH",
            Self::CaseNotFound => "CASE_NOT_FOUND",
            Self::InvalidSourceRow => "INVALID_SOURCE_ROW",
            Self::StoreError => "STORE_ERROR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEventError {
    pub reason: MismatchReason,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidate_trustee_ids: Vec<String>,
}

/// Trustee as named by the legacy source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DxtrTrustee {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_truid: Option<String>,
}

/// A discovered legacy transaction. After processing it carries either the
/// linked trustee id or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    #[serde(rename = "type")]
    pub event_type: SyncEventType,
    pub case_id: String,
    pub tx_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dxtr_trustee: Option<DxtrTrustee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trustee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<SyncEventError>,
}

impl SyncEvent {
    pub fn new(
        event_type: SyncEventType,
        case_id: impl Into<String>,
        tx_id: impl Into<String>,
        dxtr_trustee: Option<DxtrTrustee>,
    ) -> Self {
        Self {
            event_type,
            case_id: case_id.into(),
            tx_id: tx_id.into(),
            dxtr_trustee,
            trustee_id: None,
            error: None,
        }
    }

    pub fn trustee_name(&self) -> Option<&str> {
        self.dxtr_trustee.as_ref().map(|t| t.full_name.as_str())
    }

    pub fn trustee_id(&self) -> Option<&str> {
        self.trustee_id.as_deref()
    }

    pub fn error(&self) -> Option<&SyncEventError> {
        self.error.as_ref()
    }

    pub fn is_linked(&self) -> bool {
        self.trustee_id.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn mark_linked(&mut self, trustee_id: impl Into<String>) {
        self.error = None;
        self.trustee_id = Some(trustee_id.into());
    }

    pub fn mark_failed(&mut self, reason: MismatchReason, message: impl Into<String>) {
        self.mark_failed_with(reason, message, Vec::new());
    }

    pub fn mark_failed_with(
        &mut self,
        reason: MismatchReason,
        message: impl Into<String>,
        candidate_trustee_ids: Vec<String>,
    ) {
        self.trustee_id = None;
        self.error = Some(SyncEventError { reason, message: message.into(), candidate_trustee_ids });
    }
}
