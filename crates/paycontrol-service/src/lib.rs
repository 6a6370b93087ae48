//! Request-scoped operations of the payment-control back office.
//!
//! Every mutating call returns a [`Recorded`] value: the caller persists the
//! attached audit entry once the mutation has been accepted.

mod commitments;
mod contracts;
mod dashboard;
mod locks;
mod suppliers;
mod users;

use std::sync::Arc;

use paycontrol_core::{CoreError, MissingContractPolicy, Store};
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

pub use contracts::ContractBalance;
pub use dashboard::DashboardSummary;
pub use paycontrol_core::Recorded;

use crate::locks::ContractLocks;

/// How concurrent commitment creations against one contract are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BudgetSerialization {
    /// Creations against the same contract run one at a time in this process.
    #[default]
    PerContract,
    /// Check and insert are not guarded; two requests can jointly exceed the
    /// ceiling.
    Disabled,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceOptions {
    pub budget_serialization: BudgetSerialization,
    pub missing_contract_policy: MissingContractPolicy,
}

pub struct PaymentControl {
    store: Arc<dyn Store>,
    options: ServiceOptions,
    locks: ContractLocks,
}

impl PaymentControl {
    pub fn new(store: Arc<dyn Store>, options: ServiceOptions) -> Self {
        Self {
            store,
            options,
            locks: ContractLocks::default(),
        }
    }

    async fn serialize_contract(&self, contract_id: Uuid) -> Option<OwnedMutexGuard<()>> {
        match self.options.budget_serialization {
            BudgetSerialization::PerContract => Some(self.locks.acquire(contract_id).await),
            BudgetSerialization::Disabled => None,
        }
    }
}

fn not_found(entity: &'static str, id: Uuid) -> CoreError {
    CoreError::NotFound { entity, id }
}
