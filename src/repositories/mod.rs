//! Typed repositories, one per entity family, over the collection adapter.
//!
//! Repositories hold nothing but their collection handle. They are built
//! from a [`RunContext`] and live no longer than it.

mod assignments;
mod case_appointments;
mod cases;
mod orders;
mod runtime_state;
mod trustees;

pub use assignments::CaseAssignmentRepository;
pub use case_appointments::CaseAppointmentsRepository;
pub use cases::CasesRepository;
pub use orders::{ConsolidationOrdersRepository, OrdersSearchPredicate};
pub use runtime_state::RuntimeStateRepository;
pub use trustees::{TrusteesRepository, normalize_name};

use crate::context::RunContext;
use crate::errors::StoreError;

/// Every repository, opened against one context.
#[derive(Clone)]
pub struct Repositories {
    pub assignments: CaseAssignmentRepository,
    pub orders: ConsolidationOrdersRepository,
    pub trustees: TrusteesRepository,
    pub cases: CasesRepository,
    pub appointments: CaseAppointmentsRepository,
    pub runtime_state: RuntimeStateRepository,
}

impl Repositories {
    /// # Errors
    /// `ServerConfig` when the target database is not configured; `Unknown`
    /// when the store cannot be reached.
    pub fn open(ctx: &RunContext) -> Result<Self, StoreError> {
        Ok(Self {
            assignments: CaseAssignmentRepository::new(ctx)?,
            orders: ConsolidationOrdersRepository::new(ctx)?,
            trustees: TrusteesRepository::new(ctx)?,
            cases: CasesRepository::new(ctx)?,
            appointments: CaseAppointmentsRepository::new(ctx)?,
            runtime_state: RuntimeStateRepository::new(ctx)?,
        })
    }
}
