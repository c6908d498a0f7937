//! Read-only access to the legacy relational source.
//!
//! Queries are parameterized: caller data travels only through named, typed
//! [`DbParam`]s, never through the SQL text.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::LegacyDbConfig;
use crate::errors::StoreError;
use crate::sync::{DxtrTrustee, MismatchReason, SyncEvent, SyncEventType};

const MODULE_NAME: &str = "LEGACY-SOURCE-GATEWAY";

#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Int(i32),
    BigInt(i64),
    VarChar(String),
    Date(chrono::NaiveDate),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbParam {
    pub name: String,
    pub value: DbValue,
}

impl DbParam {
    pub fn new(name: impl Into<String>, value: DbValue) -> Self {
        Self { name: name.into(), value }
    }
}

pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResults {
    pub success: bool,
    pub results: Vec<Row>,
    pub error: Option<String>,
}

impl QueryResults {
    pub fn ok(results: Vec<Row>) -> Self {
        Self { success: true, results, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, results: Vec::new(), error: Some(error.into()) }
    }
}

#[async_trait]
pub trait LegacySourceGateway: Send + Sync {
    /// Runs `sql` with `params` bound to their `@name` placeholders. The
    /// gateway enforces its own per-call timeout.
    async fn execute_query(&self, config: &LegacyDbConfig, sql: &str, params: &[DbParam]) -> QueryResults;
}

pub const TRUSTEE_APPOINTMENTS_SQL: &str = "\
SELECT TOP (@limit)
  CONCAT(C.CS_DIV, '-', C.CASE_ID) AS caseId,
  T.TX_ID AS txId,
  LTRIM(RTRIM(CONCAT(P.PY_FIRST_NAME, ' ', P.PY_MIDDLE_NAME, ' ', P.PY_LAST_NAME))) AS fullName,
  P.TRU_ID AS legacyTruid
FROM AO_TX T
JOIN AO_CS C ON C.CS_CASEID = T.CS_CASEID AND C.COURT_ID = T.COURT_ID
JOIN AO_PY P ON P.CS_CASEID = T.CS_CASEID AND P.COURT_ID = T.COURT_ID AND P.PY_ROLE = 'tr'
WHERE T.TX_TYPE = 'O' AND T.TX_CODE = 'CTR' AND T.TX_ID > @txId
ORDER BY T.TX_ID ASC";

/// One pull from the legacy source.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentBatch {
    pub events: Vec<SyncEvent>,
    /// Highest transaction id observed, or the input watermark when nothing
    /// new was found.
    pub latest_tx_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppointmentRow {
    case_id: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    legacy_truid: Option<Value>,
}

fn value_as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_string(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        other => Some(other.to_string()),
    }
}

/// Delta reader for trustee appointment transactions.
#[derive(Clone)]
pub struct TrusteeAppointmentsSource {
    gateway: Arc<dyn LegacySourceGateway>,
    config: LegacyDbConfig,
    page_size: usize,
}

impl TrusteeAppointmentsSource {
    pub fn new(gateway: Arc<dyn LegacySourceGateway>, config: LegacyDbConfig, page_size: usize) -> Self {
        Self { gateway, config, page_size }
    }

    /// Appointments recorded after `since_tx_id`, oldest first.
    ///
    /// # Errors
    /// `BadInput` when the watermark is not numeric; `Unknown` when the legacy
    /// source cannot be queried.
    pub async fn get_trustee_appointments(&self, since_tx_id: &str) -> Result<AppointmentBatch, StoreError> {
        let since: i64 = since_tx_id.trim().parse().map_err(|_| {
            StoreError::bad_input(MODULE_NAME, format!("Watermark is not a transaction id: {since_tx_id}"))
        })?;
        let limit = i32::try_from(self.page_size).unwrap_or(i32::MAX);
        let params = [
            DbParam::new("txId", DbValue::BigInt(since)),
            DbParam::new("limit", DbValue::Int(limit)),
        ];
        let res = self.gateway.execute_query(&self.config, TRUSTEE_APPOINTMENTS_SQL, &params).await;
        if !res.success {
            let msg = res.error.unwrap_or_else(|| "unknown failure".to_string());
            log::error!("[{MODULE_NAME}] appointment query failed: {msg}");
            return Err(StoreError::unknown(
                MODULE_NAME,
                format!("Failed to retrieve trustee appointments: {msg}"),
            ));
        }

        let mut latest = since;
        let mut events = Vec::with_capacity(res.results.len());
        for row in res.results {
            // The watermark follows every row the query returned, decodable or not.
            let Some(tx_id) = row.get("txId").and_then(value_as_i64) else {
                log::warn!("[{MODULE_NAME}] skipping appointment row without a numeric txId");
                continue;
            };
            latest = latest.max(tx_id);
            let raw_case_id = row.get("caseId").and_then(value_as_string).unwrap_or_default();
            let row: AppointmentRow = match serde_json::from_value(Value::Object(row)) {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("[{MODULE_NAME}] malformed appointment row at txId {tx_id}: {e}");
                    let mut event =
                        SyncEvent::new(SyncEventType::TrusteeAppointment, raw_case_id, tx_id.to_string(), None);
                    event.mark_failed(MismatchReason::InvalidSourceRow, format!("Malformed legacy row: {e}"));
                    events.push(event);
                    continue;
                }
            };
            let dxtr_trustee = row.full_name.map(|full_name| DxtrTrustee {
                full_name,
                legacy_truid: row.legacy_truid.as_ref().and_then(value_as_string),
            });
            events.push(SyncEvent::new(
                SyncEventType::TrusteeAppointment,
                row.case_id,
                tx_id.to_string(),
                dxtr_trustee,
            ));
        }
        log::debug!("[{MODULE_NAME}] {} appointment(s) after txId {since}", events.len());
        Ok(AppointmentBatch { events, latest_tx_id: latest.to_string() })
    }
}

/// A staged appointment transaction held by [`StaticLegacySource`].
#[derive(Debug, Clone, PartialEq)]
pub struct StagedAppointment {
    pub case_id: String,
    pub tx_id: i64,
    pub full_name: Option<String>,
    pub legacy_truid: Option<String>,
}

#[derive(Default)]
struct StaticInner {
    rows: Vec<Row>,
    unreachable: bool,
    calls: usize,
}

/// In-process legacy source that answers the appointment delta query from
/// staged rows, honoring the `@txId` and `@limit` parameters.
#[derive(Clone, Default)]
pub struct StaticLegacySource {
    inner: Arc<Mutex<StaticInner>>,
}

impl StaticLegacySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, case_id: &str, tx_id: i64, full_name: &str) {
        self.stage_row(StagedAppointment {
            case_id: case_id.to_string(),
            tx_id,
            full_name: Some(full_name.to_string()),
            legacy_truid: None,
        });
    }

    pub fn stage_row(&self, staged: StagedAppointment) {
        let mut row = Row::new();
        row.insert("caseId".into(), Value::from(staged.case_id));
        row.insert("txId".into(), Value::from(staged.tx_id));
        row.insert("fullName".into(), staged.full_name.map_or(Value::Null, Value::from));
        row.insert("legacyTruid".into(), staged.legacy_truid.map_or(Value::Null, Value::from));
        self.stage_raw(row);
    }

    /// Stages a row exactly as given. Rows without a numeric `txId` are
    /// never returned.
    pub fn stage_raw(&self, row: Row) {
        self.inner.lock().rows.push(row);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.lock().unreachable = unreachable;
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().calls
    }
}

fn param<'a>(params: &'a [DbParam], name: &str) -> Option<&'a DbValue> {
    params.iter().find(|p| p.name == name).map(|p| &p.value)
}

#[async_trait]
impl LegacySourceGateway for StaticLegacySource {
    async fn execute_query(&self, _config: &LegacyDbConfig, _sql: &str, params: &[DbParam]) -> QueryResults {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        if inner.unreachable {
            return QueryResults::failed("connection timed out");
        }
        let since = match param(params, "txId") {
            Some(DbValue::BigInt(v)) => *v,
            _ => return QueryResults::failed("missing @txId parameter"),
        };
        let limit = match param(params, "limit") {
            Some(DbValue::Int(v)) => usize::try_from(*v).unwrap_or(0),
            _ => usize::MAX,
        };
        let mut rows: Vec<(i64, &Row)> = inner
            .rows
            .iter()
            .filter_map(|r| r.get("txId").and_then(value_as_i64).map(|tx| (tx, r)))
            .filter(|(tx, _)| *tx > since)
            .collect();
        rows.sort_by_key(|(tx, _)| *tx);
        let results = rows.into_iter().take(limit).map(|(_, r)| r.clone()).collect();
        QueryResults::ok(results)
    }
}
