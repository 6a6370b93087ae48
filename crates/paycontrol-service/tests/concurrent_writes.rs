//! Races a payment against an edit or a deletion of the same commitment.
//! Both requests read the row before either writes.

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use paycontrol_core::{
    Commitment, CommitmentPatch, CommitmentStatus, CommitmentStore, CommitmentVersion, Contract,
    ContractStore, CoreError, StatusTotals, Supplier, SupplierStore, User, UserStore,
};
use paycontrol_service::{PaymentControl, ServiceOptions};
use paycontrol_store::InMemoryStore;
use rust_decimal::Decimal;
use tokio::sync::Barrier;
use uuid::Uuid;

use support::*;

/// Holds the next two commitment lookups until both have arrived.
struct LockstepStore {
    inner: InMemoryStore,
    barrier: Barrier,
    pending: AtomicUsize,
}

impl LockstepStore {
    fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            barrier: Barrier::new(2),
            pending: AtomicUsize::new(0),
        }
    }

    fn arm(&self) {
        self.pending.store(2, Ordering::SeqCst);
    }
}

#[async_trait]
impl SupplierStore for LockstepStore {
    async fn insert_supplier(&self, supplier: &Supplier) -> anyhow::Result<()> {
        self.inner.insert_supplier(supplier).await
    }
    async fn update_supplier(&self, supplier: &Supplier) -> anyhow::Result<()> {
        self.inner.update_supplier(supplier).await
    }
    async fn find_supplier(&self, id: Uuid) -> anyhow::Result<Option<Supplier>> {
        self.inner.find_supplier(id).await
    }
    async fn supplier_tax_id_taken(&self, tax_id: &str) -> anyhow::Result<bool> {
        self.inner.supplier_tax_id_taken(tax_id).await
    }
    async fn list_suppliers(&self) -> anyhow::Result<Vec<Supplier>> {
        self.inner.list_suppliers().await
    }
    async fn count_suppliers(&self) -> anyhow::Result<i64> {
        self.inner.count_suppliers().await
    }
}

#[async_trait]
impl ContractStore for LockstepStore {
    async fn insert_contract(&self, contract: &Contract) -> anyhow::Result<()> {
        self.inner.insert_contract(contract).await
    }
    async fn update_contract(&self, contract: &Contract) -> anyhow::Result<()> {
        self.inner.update_contract(contract).await
    }
    async fn find_contract(&self, id: Uuid) -> anyhow::Result<Option<Contract>> {
        self.inner.find_contract(id).await
    }
    async fn contract_number_taken(&self, number: &str) -> anyhow::Result<bool> {
        self.inner.contract_number_taken(number).await
    }
    async fn list_contracts(&self) -> anyhow::Result<Vec<Contract>> {
        self.inner.list_contracts().await
    }
    async fn count_contracts(&self) -> anyhow::Result<i64> {
        self.inner.count_contracts().await
    }
}

#[async_trait]
impl CommitmentStore for LockstepStore {
    async fn insert_commitment(&self, commitment: &Commitment) -> anyhow::Result<()> {
        self.inner.insert_commitment(commitment).await
    }
    async fn update_commitment(
        &self,
        commitment: &Commitment,
        expected: CommitmentVersion,
    ) -> anyhow::Result<bool> {
        self.inner.update_commitment(commitment, expected).await
    }
    async fn find_commitment(&self, id: Uuid) -> anyhow::Result<Option<Commitment>> {
        let found = self.inner.find_commitment(id).await;
        let hold = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if hold {
            self.barrier.wait().await;
        }
        found
    }
    async fn commitment_number_taken(&self, number: &str) -> anyhow::Result<bool> {
        self.inner.commitment_number_taken(number).await
    }
    async fn list_commitments(
        &self,
        status: Option<CommitmentStatus>,
    ) -> anyhow::Result<Vec<Commitment>> {
        self.inner.list_commitments(status).await
    }
    async fn committed_total(&self, contract_id: Uuid) -> anyhow::Result<Decimal> {
        self.inner.committed_total(contract_id).await
    }
    async fn status_totals(&self) -> anyhow::Result<Vec<StatusTotals>> {
        self.inner.status_totals().await
    }
}

#[async_trait]
impl UserStore for LockstepStore {
    async fn insert_user(&self, user: &User) -> anyhow::Result<()> {
        self.inner.insert_user(user).await
    }
    async fn update_user(&self, user: &User) -> anyhow::Result<()> {
        self.inner.update_user(user).await
    }
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        self.inner.find_user(id).await
    }
    async fn user_email_taken(&self, email: &str) -> anyhow::Result<bool> {
        self.inner.user_email_taken(email).await
    }
    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        self.inner.list_users().await
    }
}

async fn approved_commitment(number: &str) -> (Arc<LockstepStore>, PaymentControl, Commitment) {
    let store = Arc::new(LockstepStore::new());
    let service = PaymentControl::new(store.clone(), ServiceOptions::default());
    let supplier = supplier(&service, "30.303.303/0001-30").await;
    let created = commitment(&service, &supplier, number, None, "400.00").await;
    let approved = service
        .change_status(&actor(), created.id, "APROVADO", None)
        .await
        .unwrap()
        .value;

    (store, service, approved)
}

#[tokio::test]
async fn edit_racing_a_payment_never_reopens_it() {
    let (store, service, approved) = approved_commitment("NE-3000").await;
    let edit = CommitmentPatch {
        description: Some("editado".into()),
        ..CommitmentPatch::default()
    };

    let (editor, payer) = (actor(), actor());
    store.arm();
    let (edited, paid) = tokio::join!(
        service.update_commitment(&editor, approved.id, edit),
        service.change_status(&payer, approved.id, "PAGO", None),
    );
    let stored = service.get_commitment(approved.id).await.unwrap();

    match (edited, paid) {
        (Err(err), Ok(_)) => {
            assert!(matches!(err, CoreError::ImmutableState { .. }), "{err:?}");
            assert_eq!(stored.status, CommitmentStatus::Paid);
            assert_eq!(stored.description, "Empenho ordinário");
        }
        (Ok(_), Err(err)) => {
            assert!(matches!(err, CoreError::ConcurrentUpdate { .. }), "{err:?}");
            assert_eq!(stored.status, CommitmentStatus::Approved);
            assert_eq!(stored.description, "editado");
        }
        other => panic!("exactly one write must win: {other:?}"),
    }
}

#[tokio::test]
async fn delete_racing_a_payment_leaves_one_outcome() {
    let (store, service, approved) = approved_commitment("NE-3001").await;

    let (deleter, payer) = (actor(), actor());
    store.arm();
    let (deleted, paid) = tokio::join!(
        service.delete_commitment(&deleter, approved.id),
        service.change_status(&payer, approved.id, "PAGO", None),
    );

    match (deleted, paid) {
        (Err(err), Ok(_)) => {
            assert_eq!(err.kind(), "ImmutableState");
            let stored = service.get_commitment(approved.id).await.unwrap();
            assert_eq!(stored.status, CommitmentStatus::Paid);
        }
        (Ok(_), Err(err)) => {
            assert_eq!(err.kind(), "NotFound");
            assert!(service.get_commitment(approved.id).await.is_err());
        }
        other => panic!("exactly one write must win: {other:?}"),
    }
}
