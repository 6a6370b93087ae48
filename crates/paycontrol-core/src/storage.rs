use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::events::{AuditEntry, AuditQuery};
use crate::models::{Commitment, CommitmentStatus, Contract, StatusTotals, Supplier, User};

/// Raised by a store when a write collides with a unique key that was free
/// at check time.
#[derive(Debug, Error)]
#[error("unique constraint on {field} violated by '{value}'")]
pub struct UniqueViolation {
    pub field: &'static str,
    pub value: String,
}

/// What a conditional commitment write expects to find stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitmentVersion {
    pub status: CommitmentStatus,
    pub updated_at: DateTime<Utc>,
}

impl CommitmentVersion {
    pub fn of(commitment: &Commitment) -> Self {
        Self {
            status: commitment.status,
            updated_at: commitment.updated_at,
        }
    }
}

// `find_*` and `list_*` only see records that are not soft-deleted; the
// `*_taken` checks look at every record ever written.

#[async_trait]
pub trait SupplierStore: Send + Sync {
    async fn insert_supplier(&self, supplier: &Supplier) -> anyhow::Result<()>;
    async fn update_supplier(&self, supplier: &Supplier) -> anyhow::Result<()>;
    async fn find_supplier(&self, id: Uuid) -> anyhow::Result<Option<Supplier>>;
    async fn supplier_tax_id_taken(&self, tax_id: &str) -> anyhow::Result<bool>;
    async fn list_suppliers(&self) -> anyhow::Result<Vec<Supplier>>;
    async fn count_suppliers(&self) -> anyhow::Result<i64>;
}

#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn insert_contract(&self, contract: &Contract) -> anyhow::Result<()>;
    async fn update_contract(&self, contract: &Contract) -> anyhow::Result<()>;
    async fn find_contract(&self, id: Uuid) -> anyhow::Result<Option<Contract>>;
    async fn contract_number_taken(&self, number: &str) -> anyhow::Result<bool>;
    async fn list_contracts(&self) -> anyhow::Result<Vec<Contract>>;
    async fn count_contracts(&self) -> anyhow::Result<i64>;
}

#[async_trait]
pub trait CommitmentStore: Send + Sync {
    async fn insert_commitment(&self, commitment: &Commitment) -> anyhow::Result<()>;
    /// Writes the row only while the stored one is live, not `PAGO` and still
    /// at `expected`. Returns `false` when that no longer holds.
    async fn update_commitment(
        &self,
        commitment: &Commitment,
        expected: CommitmentVersion,
    ) -> anyhow::Result<bool>;
    async fn find_commitment(&self, id: Uuid) -> anyhow::Result<Option<Commitment>>;
    async fn commitment_number_taken(&self, number: &str) -> anyhow::Result<bool>;
    /// Newest first, optionally restricted to one status.
    async fn list_commitments(
        &self,
        status: Option<CommitmentStatus>,
    ) -> anyhow::Result<Vec<Commitment>>;
    /// Sum of `amount` over the non-deleted commitments linked to a contract.
    async fn committed_total(&self, contract_id: Uuid) -> anyhow::Result<Decimal>;
    /// Only statuses with at least one commitment are returned.
    async fn status_totals(&self) -> anyhow::Result<Vec<StatusTotals>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> anyhow::Result<()>;
    async fn update_user(&self, user: &User) -> anyhow::Result<()>;
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn user_email_taken(&self, email: &str) -> anyhow::Result<bool>;
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;
}

/// Everything the service layer needs from persistence.
pub trait Store: SupplierStore + ContractStore + CommitmentStore + UserStore {}

impl<T> Store for T where T: SupplierStore + ContractStore + CommitmentStore + UserStore {}

/// Durable home of the audit trail.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<()>;
    /// Newest first.
    async fn list(&self, query: &AuditQuery) -> anyhow::Result<Vec<AuditEntry>>;
}
