//! Watermark-driven incremental sync of trustee appointments.
//!
//! One run: read the stream's watermark, pull newer legacy transactions,
//! match each named trustee to a trustee document, link the case, then move
//! the watermark to the highest transaction observed. Individual events fail
//! in place; only discovery failures and configuration errors end a run.

mod event;

pub use event::{DxtrTrustee, MismatchReason, SyncEvent, SyncEventError, SyncEventType};

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::SyncConfig;
use crate::context::RunContext;
use crate::errors::{ErrorKind, StoreError};
use crate::gateway::{LegacySourceGateway, TrusteeAppointmentsSource};
use crate::model::{CaseAppointment, RuntimeState, Trustee, now_iso};
use crate::repositories::{
    CaseAppointmentsRepository, CasesRepository, Repositories, RuntimeStateRepository, TrusteesRepository,
    normalize_name,
};

const MODULE_NAME: &str = "SYNC-TRUSTEE-APPOINTMENTS";
const SYSTEM_USER: &str = "SYSTEM";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub events: Vec<SyncEvent>,
    pub success_count: usize,
    pub failure_count: usize,
    pub previous_tx_id: String,
    pub latest_tx_id: String,
    pub watermark_advanced: bool,
}

impl SyncReport {
    pub fn failed_events(&self) -> impl Iterator<Item = &SyncEvent> {
        self.events.iter().filter(|e| e.is_failed())
    }
}

#[derive(Clone)]
pub struct TrusteeAppointmentSync {
    source: TrusteeAppointmentsSource,
    trustees: TrusteesRepository,
    cases: CasesRepository,
    appointments: CaseAppointmentsRepository,
    runtime_state: RuntimeStateRepository,
    settings: SyncConfig,
}

impl TrusteeAppointmentSync {
    pub fn new(
        source: TrusteeAppointmentsSource,
        trustees: TrusteesRepository,
        cases: CasesRepository,
        appointments: CaseAppointmentsRepository,
        runtime_state: RuntimeStateRepository,
        settings: SyncConfig,
    ) -> Self {
        Self { source, trustees, cases, appointments, runtime_state, settings }
    }

    /// Runs one discover, match, apply, advance cycle.
    ///
    /// # Errors
    /// Fails without touching the watermark when the watermark cannot be read,
    /// the legacy source cannot be queried, or any event hits a
    /// configuration error.
    pub async fn run(&self) -> Result<SyncReport, StoreError> {
        let stream = self.settings.stream.as_str();
        let stored = self.runtime_state.find(stream).await?;
        let first_run = stored.is_none();
        let previous = match stored {
            Some(state) => state,
            None => {
                log::info!(
                    "[{MODULE_NAME}] no watermark for {stream}; starting after txId {}",
                    self.settings.starting_tx_id
                );
                RuntimeState::new(stream, self.settings.starting_tx_id.clone())
            }
        };

        let batch = self.source.get_trustee_appointments(&previous.tx_id).await?;
        log::info!(
            "[{MODULE_NAME}] discovered {} event(s) after txId {}",
            batch.events.len(),
            previous.tx_id
        );

        let events = self.process(batch.events).await?;
        let failure_count = events.iter().filter(|e| e.is_failed()).count();
        let success_count = events.len() - failure_count;

        let mut watermark_advanced = false;
        // The first run records its starting point even when nothing is new.
        if first_run || batch.latest_tx_id != previous.tx_id {
            let next = RuntimeState { tx_id: batch.latest_tx_id.clone(), ..previous.clone() };
            match self.runtime_state.upsert(&next).await {
                Ok(_) => watermark_advanced = true,
                Err(e) => log::error!(
                    "[{MODULE_NAME}] failed to advance {stream} watermark to {}: {e}",
                    batch.latest_tx_id
                ),
            }
        }

        for event in &events {
            if let Some(err) = event.error() {
                log::warn!(
                    "[{MODULE_NAME}] case {} (txId {}): {} {}",
                    event.case_id,
                    event.tx_id,
                    err.reason,
                    err.message
                );
            }
        }
        log::info!(
            "[{MODULE_NAME}] run complete: {success_count} linked, {failure_count} failed, watermark {} -> {}",
            previous.tx_id,
            batch.latest_tx_id
        );

        Ok(SyncReport {
            events,
            success_count,
            failure_count,
            previous_tx_id: previous.tx_id,
            latest_tx_id: batch.latest_tx_id,
            watermark_advanced,
        })
    }

    /// Processes events grouped by case. Events for one case run in
    /// discovery order; cases run concurrently up to `max_concurrency`.
    async fn process(&self, events: Vec<SyncEvent>) -> Result<Vec<SyncEvent>, StoreError> {
        let total = events.len();
        let mut groups: Vec<Vec<(usize, SyncEvent)>> = Vec::new();
        let mut by_case: HashMap<String, usize> = HashMap::new();
        for (idx, event) in events.into_iter().enumerate() {
            let slot = *by_case.entry(event.case_id.clone()).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push((idx, event));
        }

        let permits = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for group in groups {
            let permits = permits.clone();
            let trustees = self.trustees.clone();
            let cases = self.cases.clone();
            let appointments = self.appointments.clone();
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| StoreError::unknown(MODULE_NAME, format!("worker pool closed: {e}")))?;
                let mut done = Vec::with_capacity(group.len());
                for (idx, event) in group {
                    done.push((idx, process_event(&trustees, &cases, &appointments, event).await?));
                }
                Ok::<_, StoreError>(done)
            });
        }

        let mut slots: Vec<Option<SyncEvent>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            let done = match joined {
                Ok(Ok(done)) => done,
                Ok(Err(fatal)) => {
                    tasks.abort_all();
                    log::error!("[{MODULE_NAME}] aborting run: {fatal}");
                    return Err(fatal);
                }
                Err(join) => {
                    tasks.abort_all();
                    return Err(StoreError::unknown(MODULE_NAME, format!("event worker failed: {join}")));
                }
            };
            for (idx, event) in done {
                slots[idx] = Some(event);
            }
        }
        Ok(slots.into_iter().flatten().collect())
    }

    /// Creates trustee records for events that failed for lack of a matching
    /// trustee. Names are deduplicated and rechecked against the store first.
    ///
    /// Operator-invoked; [`run`](Self::run) never creates trustees.
    pub async fn seed_missing_trustees(&self, events: &[SyncEvent]) -> Result<Vec<Trustee>, StoreError> {
        let mut seen = HashSet::new();
        let mut created = Vec::new();
        for event in events {
            if event.error().map(|e| e.reason) != Some(MismatchReason::NoTrusteeMatch) {
                continue;
            }
            let Some(dxtr) = &event.dxtr_trustee else { continue };
            let name = normalize_name(&dxtr.full_name);
            if name.is_empty() || !seen.insert(name.to_lowercase()) {
                continue;
            }
            if !self.trustees.find_trustees_by_name(&name).await?.is_empty() {
                continue;
            }
            let mut trustee = Trustee::new(uuid::Uuid::new_v4().to_string(), name);
            trustee.legacy_truid = dxtr.legacy_truid.clone();
            created.push(self.trustees.create_trustee(&trustee).await?);
        }
        log::info!("[{MODULE_NAME}] seeded {} trustee(s)", created.len());
        Ok(created)
    }
}

/// Matches and applies one event. Only configuration errors escape; every
/// other failure is recorded on the event.
async fn process_event(
    trustees: &TrusteesRepository,
    cases: &CasesRepository,
    appointments: &CaseAppointmentsRepository,
    mut event: SyncEvent,
) -> Result<SyncEvent, StoreError> {
    if event.is_failed() {
        return Ok(event);
    }
    let Some(name) = event.trustee_name().map(normalize_name).filter(|n| !n.is_empty()) else {
        event.mark_failed(MismatchReason::NoTrusteeMatch, "Legacy transaction names no trustee.");
        return Ok(event);
    };

    let matches = match trustees.find_trustees_by_name(&name).await {
        Ok(found) => found,
        Err(e) => return record_store_error(event, e),
    };
    let trustee_id = match matches.as_slice() {
        [] => {
            event.mark_failed(MismatchReason::NoTrusteeMatch, format!("No trustee named \"{name}\"."));
            return Ok(event);
        }
        [only] => only.trustee_id.clone(),
        many => {
            let ids = many.iter().map(|t| t.trustee_id.clone()).collect();
            event.mark_failed_with(
                MismatchReason::MultipleTrusteesMatch,
                format!("{} trustees named \"{name}\".", many.len()),
                ids,
            );
            return Ok(event);
        }
    };

    match cases.link_trustee(&event.case_id, &trustee_id).await {
        Ok(true) => {
            log::info!("[{MODULE_NAME}] linked case {} to trustee {trustee_id} (\"{name}\")", event.case_id);
        }
        Ok(false) => {}
        Err(e) if e.is_not_found() => {
            event.mark_failed(MismatchReason::CaseNotFound, format!("Case {} not found.", event.case_id));
            return Ok(event);
        }
        Err(e) => return record_store_error(event, e),
    }

    if let Err(e) = record_appointment(appointments, &event.case_id, &trustee_id).await {
        return record_store_error(event, e);
    }
    event.mark_linked(trustee_id);
    Ok(event)
}

/// Makes `trustee_id` the case's open appointment. A different open
/// appointment is closed first; the same one is left alone.
async fn record_appointment(
    appointments: &CaseAppointmentsRepository,
    case_id: &str,
    trustee_id: &str,
) -> Result<(), StoreError> {
    if let Some(current) = appointments.get_active_case_appointment(case_id).await? {
        if current.trustee_id == trustee_id {
            return Ok(());
        }
        let closed = CaseAppointment {
            unassigned_on: Some(now_iso()),
            updated_by: SYSTEM_USER.to_string(),
            ..current
        };
        appointments.update_case_appointment(&closed).await?;
        log::debug!("[{MODULE_NAME}] closed appointment of trustee {} on case {case_id}", closed.trustee_id);
    }
    appointments
        .create_case_appointment(&CaseAppointment::new(case_id, trustee_id, SYSTEM_USER))
        .await?;
    Ok(())
}

fn record_store_error(mut event: SyncEvent, err: StoreError) -> Result<SyncEvent, StoreError> {
    if err.kind() == ErrorKind::ServerConfig {
        return Err(err);
    }
    event.mark_failed(MismatchReason::StoreError, err.to_string());
    Ok(event)
}

/// Wires the pipeline from a context's configuration and repositories.
pub fn pipeline_for(
    ctx: &RunContext,
    gateway: Arc<dyn LegacySourceGateway>,
) -> Result<TrusteeAppointmentSync, StoreError> {
    let repos = Repositories::open(ctx)?;
    let config = ctx.config();
    let source = TrusteeAppointmentsSource::new(gateway, config.legacy.clone(), config.sync.page_size);
    Ok(TrusteeAppointmentSync::new(
        source,
        repos.trustees,
        repos.cases,
        repos.appointments,
        repos.runtime_state,
        config.sync.clone(),
    ))
}

/// Runs one sync cycle with repositories scoped to `ctx`.
pub async fn run_in_context(
    ctx: &RunContext,
    gateway: Arc<dyn LegacySourceGateway>,
) -> Result<SyncReport, StoreError> {
    log::debug!("[{MODULE_NAME}] run {} starting", ctx.invocation_id());
    pipeline_for(ctx, gateway)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_escape_the_event() {
        let event = SyncEvent::new(SyncEventType::TrusteeAppointment, "081-1", "1", None);
        let err = record_store_error(event.clone(), StoreError::server_config("T", "no db")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerConfig);

        let kept = record_store_error(event, StoreError::unknown("T", "boom")).unwrap();
        assert_eq!(kept.error().map(|e| e.reason), Some(MismatchReason::StoreError));
    }
}
