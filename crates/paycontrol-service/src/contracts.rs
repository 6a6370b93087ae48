use chrono::Utc;
use paycontrol_core::{
    Actor, AuditAction, AuditEntry, Contract, ContractPatch, CoreError, EntityKind, NewContract,
    Recorded, requests::validate_period,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{PaymentControl, not_found};

/// How much of a contract is already committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractBalance {
    pub contract_id: Uuid,
    pub number: String,
    pub total_value: Decimal,
    pub committed: Decimal,
    /// Negative when the total was reduced below what is already committed.
    pub available: Decimal,
}

impl PaymentControl {
    pub async fn get_contract(&self, id: Uuid) -> Result<Contract, CoreError> {
        self.store
            .find_contract(id)
            .await?
            .ok_or_else(|| not_found("contract", id))
    }

    pub async fn list_contracts(&self) -> Result<Vec<Contract>, CoreError> {
        Ok(self.store.list_contracts().await?)
    }

    pub async fn contract_balance(&self, id: Uuid) -> Result<ContractBalance, CoreError> {
        let contract = self.get_contract(id).await?;
        let committed = self.store.committed_total(id).await?;

        Ok(ContractBalance {
            contract_id: contract.id,
            number: contract.number,
            total_value: contract.total_value,
            committed,
            available: contract.total_value - committed,
        })
    }

    pub async fn create_contract(
        &self,
        actor: &Actor,
        input: NewContract,
    ) -> Result<Recorded<Contract>, CoreError> {
        let input = input.normalized()?;

        let supplier = self.get_supplier(input.supplier_id).await?;
        if self.store.contract_number_taken(&input.number).await? {
            return Err(CoreError::DuplicateKey {
                field: "number",
                value: input.number,
            });
        }

        let now = Utc::now();
        let contract = Contract {
            id: Uuid::new_v4(),
            number: input.number,
            supplier_id: supplier.id,
            subject: input.subject,
            total_value: input.total_value,
            start_date: input.start_date,
            end_date: input.end_date,
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            deleted: false,
        };
        self.store.insert_contract(&contract).await?;

        info!(contract_id = %contract.id, total_value = %contract.total_value, "contract created");

        let audit = AuditEntry::new(
            actor,
            AuditAction::Create,
            EntityKind::Contract,
            contract.id,
            format!(
                "Contrato {} criado - Fornecedor: {}",
                contract.number, supplier.legal_name
            ),
        );

        Ok(Recorded::new(contract, audit))
    }

    /// Lowering `total_value` below the committed sum is allowed; existing
    /// commitments are not re-validated.
    pub async fn update_contract(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: ContractPatch,
    ) -> Result<Recorded<Contract>, CoreError> {
        let mut contract = self.get_contract(id).await?;
        let patch = patch.normalized()?;

        if let Some(number) = patch.number {
            if number != contract.number {
                if self.store.contract_number_taken(&number).await? {
                    return Err(CoreError::DuplicateKey {
                        field: "number",
                        value: number,
                    });
                }
                contract.number = number;
            }
        }
        if let Some(supplier_id) = patch.supplier_id {
            contract.supplier_id = self.get_supplier(supplier_id).await?.id;
        }
        if let Some(subject) = patch.subject {
            contract.subject = subject;
        }
        if let Some(total_value) = patch.total_value {
            contract.total_value = total_value;
        }
        if let Some(start_date) = patch.start_date {
            contract.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            contract.end_date = end_date;
        }
        if let Some(status) = patch.status {
            contract.status = status;
        }
        validate_period(contract.start_date, contract.end_date)?;
        contract.updated_at = Utc::now();

        self.store.update_contract(&contract).await?;

        if patch.total_value.is_some() {
            let committed = self.store.committed_total(contract.id).await?;
            if committed > contract.total_value {
                warn!(
                    contract_id = %contract.id,
                    committed = %committed,
                    total_value = %contract.total_value,
                    "contract total is now below its committed sum"
                );
            }
        }

        let audit = AuditEntry::new(
            actor,
            AuditAction::Update,
            EntityKind::Contract,
            contract.id,
            format!("Contrato {} atualizado", contract.number),
        );

        Ok(Recorded::new(contract, audit))
    }

    pub async fn delete_contract(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<Recorded<()>, CoreError> {
        let mut contract = self.get_contract(id).await?;
        contract.deleted = true;
        contract.updated_at = Utc::now();
        self.store.update_contract(&contract).await?;

        info!(contract_id = %contract.id, "contract soft-deleted");

        let audit = AuditEntry::new(
            actor,
            AuditAction::Delete,
            EntityKind::Contract,
            contract.id,
            format!("Contrato {} excluído", contract.number),
        );

        Ok(Recorded::new((), audit))
    }
}
