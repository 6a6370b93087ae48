use std::collections::HashMap;

use async_trait::async_trait;
use paycontrol_core::{
    AuditEntry, AuditLog, AuditQuery, Commitment, CommitmentStatus, CommitmentStore,
    CommitmentVersion, Contract, ContractStore, StatusTotals, Supplier, SupplierStore,
    UniqueViolation, User, UserStore,
};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store. Unique keys are enforced on write the same way the
/// database constraints enforce them.
#[derive(Default)]
pub struct InMemoryStore {
    suppliers: RwLock<HashMap<Uuid, Supplier>>,
    contracts: RwLock<HashMap<Uuid, Contract>>,
    commitments: RwLock<HashMap<Uuid, Commitment>>,
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ensure_unique<T>(
    rows: &HashMap<Uuid, T>,
    id: Uuid,
    field: &'static str,
    value: &str,
    key: impl Fn(&T) -> &str,
) -> anyhow::Result<()> {
    let clash = rows
        .iter()
        .any(|(other_id, row)| *other_id != id && key(row) == value);
    if clash {
        return Err(UniqueViolation {
            field,
            value: value.to_string(),
        }
        .into());
    }

    Ok(())
}

fn ensure_present<T>(rows: &HashMap<Uuid, T>, entity: &str, id: Uuid) -> anyhow::Result<()> {
    if !rows.contains_key(&id) {
        anyhow::bail!("{entity} {id} does not exist");
    }

    Ok(())
}

fn add_amount(total: Decimal, amount: Decimal) -> anyhow::Result<Decimal> {
    total
        .checked_add(amount)
        .ok_or_else(|| anyhow::anyhow!("amount sum overflowed"))
}

#[async_trait]
impl SupplierStore for InMemoryStore {
    async fn insert_supplier(&self, supplier: &Supplier) -> anyhow::Result<()> {
        let mut suppliers = self.suppliers.write().await;
        ensure_unique(&*suppliers, supplier.id, "tax_id", &supplier.tax_id, |s| s.tax_id.as_str())?;
        suppliers.insert(supplier.id, supplier.clone());
        Ok(())
    }

    async fn update_supplier(&self, supplier: &Supplier) -> anyhow::Result<()> {
        let mut suppliers = self.suppliers.write().await;
        ensure_present(&*suppliers, "supplier", supplier.id)?;
        ensure_unique(&*suppliers, supplier.id, "tax_id", &supplier.tax_id, |s| s.tax_id.as_str())?;
        suppliers.insert(supplier.id, supplier.clone());
        Ok(())
    }

    async fn find_supplier(&self, id: Uuid) -> anyhow::Result<Option<Supplier>> {
        let suppliers = self.suppliers.read().await;
        Ok(suppliers.get(&id).filter(|s| !s.deleted).cloned())
    }

    async fn supplier_tax_id_taken(&self, tax_id: &str) -> anyhow::Result<bool> {
        let suppliers = self.suppliers.read().await;
        Ok(suppliers.values().any(|s| s.tax_id == tax_id))
    }

    async fn list_suppliers(&self) -> anyhow::Result<Vec<Supplier>> {
        let suppliers = self.suppliers.read().await;
        let mut items: Vec<Supplier> = suppliers.values().filter(|s| !s.deleted).cloned().collect();
        items.sort_by(|a, b| a.legal_name.cmp(&b.legal_name));
        Ok(items)
    }

    async fn count_suppliers(&self) -> anyhow::Result<i64> {
        let suppliers = self.suppliers.read().await;
        Ok(suppliers.values().filter(|s| !s.deleted).count() as i64)
    }
}

#[async_trait]
impl ContractStore for InMemoryStore {
    async fn insert_contract(&self, contract: &Contract) -> anyhow::Result<()> {
        let mut contracts = self.contracts.write().await;
        ensure_unique(&*contracts, contract.id, "number", &contract.number, |c| c.number.as_str())?;
        contracts.insert(contract.id, contract.clone());
        Ok(())
    }

    async fn update_contract(&self, contract: &Contract) -> anyhow::Result<()> {
        let mut contracts = self.contracts.write().await;
        ensure_present(&*contracts, "contract", contract.id)?;
        ensure_unique(&*contracts, contract.id, "number", &contract.number, |c| c.number.as_str())?;
        contracts.insert(contract.id, contract.clone());
        Ok(())
    }

    async fn find_contract(&self, id: Uuid) -> anyhow::Result<Option<Contract>> {
        let contracts = self.contracts.read().await;
        Ok(contracts.get(&id).filter(|c| !c.deleted).cloned())
    }

    async fn contract_number_taken(&self, number: &str) -> anyhow::Result<bool> {
        let contracts = self.contracts.read().await;
        Ok(contracts.values().any(|c| c.number == number))
    }

    async fn list_contracts(&self) -> anyhow::Result<Vec<Contract>> {
        let contracts = self.contracts.read().await;
        let mut items: Vec<Contract> = contracts.values().filter(|c| !c.deleted).cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn count_contracts(&self) -> anyhow::Result<i64> {
        let contracts = self.contracts.read().await;
        Ok(contracts.values().filter(|c| !c.deleted).count() as i64)
    }
}

#[async_trait]
impl CommitmentStore for InMemoryStore {
    async fn insert_commitment(&self, commitment: &Commitment) -> anyhow::Result<()> {
        let mut commitments = self.commitments.write().await;
        ensure_unique(&*commitments, commitment.id, "number", &commitment.number, |c| {
            c.number.as_str()
        })?;
        commitments.insert(commitment.id, commitment.clone());
        Ok(())
    }

    async fn update_commitment(
        &self,
        commitment: &Commitment,
        expected: CommitmentVersion,
    ) -> anyhow::Result<bool> {
        let mut commitments = self.commitments.write().await;
        let writable = commitments.get(&commitment.id).is_some_and(|stored| {
            !stored.deleted
                && stored.status != CommitmentStatus::Paid
                && CommitmentVersion::of(stored) == expected
        });
        if !writable {
            return Ok(false);
        }

        ensure_unique(&*commitments, commitment.id, "number", &commitment.number, |c| {
            c.number.as_str()
        })?;
        commitments.insert(commitment.id, commitment.clone());
        Ok(true)
    }

    async fn find_commitment(&self, id: Uuid) -> anyhow::Result<Option<Commitment>> {
        let commitments = self.commitments.read().await;
        Ok(commitments.get(&id).filter(|c| !c.deleted).cloned())
    }

    async fn commitment_number_taken(&self, number: &str) -> anyhow::Result<bool> {
        let commitments = self.commitments.read().await;
        Ok(commitments.values().any(|c| c.number == number))
    }

    async fn list_commitments(
        &self,
        status: Option<CommitmentStatus>,
    ) -> anyhow::Result<Vec<Commitment>> {
        let commitments = self.commitments.read().await;
        let mut items: Vec<Commitment> = commitments
            .values()
            .filter(|c| !c.deleted)
            .filter(|c| status.is_none_or(|wanted| c.status == wanted))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn committed_total(&self, contract_id: Uuid) -> anyhow::Result<Decimal> {
        let commitments = self.commitments.read().await;
        commitments
            .values()
            .filter(|c| !c.deleted && c.contract_id == Some(contract_id))
            .try_fold(Decimal::ZERO, |total, c| add_amount(total, c.amount))
    }

    async fn status_totals(&self) -> anyhow::Result<Vec<StatusTotals>> {
        let commitments = self.commitments.read().await;
        let mut totals: Vec<StatusTotals> = Vec::new();

        for commitment in commitments.values().filter(|c| !c.deleted) {
            match totals.iter_mut().find(|t| t.status == commitment.status) {
                Some(entry) => {
                    entry.count += 1;
                    entry.value = add_amount(entry.value, commitment.amount)?;
                }
                None => totals.push(StatusTotals {
                    status: commitment.status,
                    count: 1,
                    value: commitment.amount,
                }),
            }
        }

        Ok(totals)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        ensure_unique(&*users, user.id, "email", &user.email, |u| u.email.as_str())?;
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> anyhow::Result<()> {
        let mut users = self.users.write().await;
        ensure_present(&*users, "user", user.id)?;
        ensure_unique(&*users, user.id, "email", &user.email, |u| u.email.as_str())?;
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).filter(|u| !u.deleted).cloned())
    }

    async fn user_email_taken(&self, email: &str) -> anyhow::Result<bool> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.email == email))
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let users = self.users.read().await;
        let mut items: Vec<User> = users.values().filter(|u| !u.deleted).cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }
}

#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry.clone());
        Ok(())
    }

    async fn list(&self, query: &AuditQuery) -> anyhow::Result<Vec<AuditEntry>> {
        let entries = self.entries.read().await;
        let limit = usize::try_from(query.limit.max(0)).unwrap_or(usize::MAX);

        Ok(entries
            .iter()
            .rev()
            .filter(|e| query.entity.is_none_or(|entity| e.entity == entity))
            .filter(|e| query.action.is_none_or(|action| e.action == action))
            .filter(|e| query.entity_id.is_none_or(|id| e.entity_id == id))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use paycontrol_core::{Actor, AuditAction, CoreError, EntityKind};

    use super::*;

    fn commitment(number: &str, contract_id: Option<Uuid>, amount: &str) -> Commitment {
        let now = Utc::now();
        Commitment {
            id: Uuid::new_v4(),
            number: number.to_string(),
            supplier_id: Uuid::new_v4(),
            has_contract: contract_id.is_some(),
            contract_id,
            payer_name: "Prefeitura Municipal".to_string(),
            payer_tax_id: "00.000.000/0001-00".to_string(),
            description: "Serviços de limpeza".to_string(),
            amount: amount.parse().unwrap(),
            due_date: None,
            notes: None,
            created_by: Uuid::new_v4(),
            status: CommitmentStatus::UnderEvaluation,
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }

    #[tokio::test]
    async fn committed_total_skips_deleted_and_other_contracts() {
        let store = InMemoryStore::new();
        let contract_id = Uuid::new_v4();

        store
            .insert_commitment(&commitment("NE-1", Some(contract_id), "300.00"))
            .await
            .unwrap();
        let mut deleted = commitment("NE-2", Some(contract_id), "150.00");
        deleted.deleted = true;
        store.insert_commitment(&deleted).await.unwrap();
        store
            .insert_commitment(&commitment("NE-3", Some(Uuid::new_v4()), "999.00"))
            .await
            .unwrap();
        store
            .insert_commitment(&commitment("NE-4", None, "10.00"))
            .await
            .unwrap();

        let total = store.committed_total(contract_id).await.unwrap();
        assert_eq!(total, "300.00".parse::<Decimal>().unwrap());
    }

    #[tokio::test]
    async fn deleted_numbers_stay_taken() {
        let store = InMemoryStore::new();
        let mut row = commitment("NE-10", None, "1.00");
        row.deleted = true;
        store.insert_commitment(&row).await.unwrap();

        assert!(store.commitment_number_taken("NE-10").await.unwrap());
        assert!(store.find_commitment(row.id).await.unwrap().is_none());

        let err = store
            .insert_commitment(&commitment("NE-10", None, "2.00"))
            .await
            .unwrap_err();
        assert!(matches!(
            CoreError::from(err),
            CoreError::DuplicateKey { field: "number", .. }
        ));
    }

    #[tokio::test]
    async fn commitment_writes_require_the_version_that_was_read() {
        let store = InMemoryStore::new();
        let mut row = commitment("NE-20", None, "50.00");
        row.status = CommitmentStatus::Approved;
        store.insert_commitment(&row).await.unwrap();

        let read = CommitmentVersion::of(&row);

        let mut paid = row.clone();
        paid.status = CommitmentStatus::Paid;
        paid.updated_at = Utc::now();
        assert!(store.update_commitment(&paid, read).await.unwrap());

        let mut edited = row.clone();
        edited.description = "editado".to_string();
        assert!(!store.update_commitment(&edited, read).await.unwrap());
        assert!(
            !store
                .update_commitment(&edited, CommitmentVersion::of(&paid))
                .await
                .unwrap()
        );

        let stored = store.find_commitment(row.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CommitmentStatus::Paid);
        assert_eq!(stored.description, "Serviços de limpeza");
    }

    #[tokio::test]
    async fn deleted_commitments_are_not_written() {
        let store = InMemoryStore::new();
        let mut row = commitment("NE-21", None, "50.00");
        row.deleted = true;
        store.insert_commitment(&row).await.unwrap();

        row.deleted = false;
        assert!(
            !store
                .update_commitment(&row, CommitmentVersion::of(&row))
                .await
                .unwrap()
        );
        assert!(store.find_commitment(row.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn audit_list_is_newest_first_and_filtered() {
        let log = InMemoryAuditLog::new();
        let actor = Actor::new(Uuid::new_v4(), "Maria");
        let target = Uuid::new_v4();

        for (action, details) in [
            (AuditAction::Create, "criado"),
            (AuditAction::StatusChange, "aprovado"),
            (AuditAction::StatusChange, "pago"),
        ] {
            let entry = AuditEntry::new(&actor, action, EntityKind::Commitment, target, details);
            log.record(&entry).await.unwrap();
        }

        let query = AuditQuery {
            action: Some(AuditAction::StatusChange),
            limit: 10,
            ..AuditQuery::default()
        };
        let entries = log.list(&query).await.unwrap();
        let details: Vec<&str> = entries.iter().map(|e| e.details.as_str()).collect();
        assert_eq!(details, ["pago", "aprovado"]);
    }
}
