use chrono::Utc;
use paycontrol_core::{
    Actor, AuditAction, AuditEntry, Commitment, CommitmentPatch, CommitmentStatus,
    CommitmentVersion, CoreError, EntityKind, MissingContractPolicy, NewCommitment, Recorded,
    StatusTransition, check_budget, ensure_mutable,
};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{PaymentControl, not_found};

impl PaymentControl {
    pub async fn get_commitment(&self, id: Uuid) -> Result<Commitment, CoreError> {
        self.store
            .find_commitment(id)
            .await?
            .ok_or_else(|| not_found("commitment", id))
    }

    pub async fn list_commitments(
        &self,
        status: Option<CommitmentStatus>,
    ) -> Result<Vec<Commitment>, CoreError> {
        Ok(self.store.list_commitments(status).await?)
    }

    /// Validates, checks uniqueness and, for contract-linked commitments,
    /// the contract budget before persisting in `EM_AVALIACAO`.
    pub async fn create_commitment(
        &self,
        actor: &Actor,
        input: NewCommitment,
    ) -> Result<Recorded<Commitment>, CoreError> {
        let input = input.normalized()?;

        if self.store.find_supplier(input.supplier_id).await?.is_none() {
            return Err(not_found("supplier", input.supplier_id));
        }
        if self.store.commitment_number_taken(&input.number).await? {
            return Err(CoreError::DuplicateKey {
                field: "number",
                value: input.number,
            });
        }

        let commitment = match input.contract_id {
            Some(contract_id) => {
                let _guard = self.serialize_contract(contract_id).await;

                let check = check_budget(
                    &*self.store,
                    contract_id,
                    input.amount,
                    self.options.missing_contract_policy,
                )
                .await?;

                let linked = match check {
                    Some(check) => {
                        info!(
                            contract_id = %contract_id,
                            committed = %check.committed,
                            total = %check.total_if_accepted,
                            ceiling = %check.ceiling,
                            "contract budget check passed"
                        );
                        Some(contract_id)
                    }
                    None => {
                        warn!(
                            contract_id = %contract_id,
                            "contract not found; creating commitment without budget enforcement"
                        );
                        None
                    }
                };

                let commitment = build_commitment(actor, input, linked);
                self.store.insert_commitment(&commitment).await?;
                commitment
            }
            None => {
                let commitment = build_commitment(actor, input, None);
                self.store.insert_commitment(&commitment).await?;
                commitment
            }
        };

        info!(
            commitment_id = %commitment.id,
            number = %commitment.number,
            amount = %commitment.amount,
            "commitment created"
        );

        let audit = AuditEntry::new(
            actor,
            AuditAction::Create,
            EntityKind::Commitment,
            commitment.id,
            format!(
                "Empenho {} criado - Status inicial: {}",
                commitment.number, commitment.status
            ),
        );

        Ok(Recorded::new(commitment, audit))
    }

    /// Moves a commitment through the status workflow. A paid commitment is
    /// rejected before the transition table is consulted.
    pub async fn change_status(
        &self,
        actor: &Actor,
        id: Uuid,
        requested: &str,
        reason: Option<String>,
    ) -> Result<Recorded<Commitment>, CoreError> {
        let mut commitment = self.get_commitment(id).await?;
        ensure_mutable(&commitment)?;
        let read = CommitmentVersion::of(&commitment);

        let requested: CommitmentStatus = requested.parse()?;
        let transition = StatusTransition::plan(commitment.status, requested, reason)?;

        commitment.status = transition.to;
        commitment.updated_at = Utc::now();
        self.write_commitment(&commitment, read).await?;

        info!(
            commitment_id = %commitment.id,
            from = %transition.from,
            to = %transition.to,
            "commitment status changed"
        );

        let audit = AuditEntry::new(
            actor,
            AuditAction::StatusChange,
            EntityKind::Commitment,
            commitment.id,
            transition.describe(),
        );

        Ok(Recorded::new(commitment, audit))
    }

    /// Applies field edits. Raising the amount of a contract-linked
    /// commitment is checked against the contract budget again.
    pub async fn update_commitment(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: CommitmentPatch,
    ) -> Result<Recorded<Commitment>, CoreError> {
        let mut commitment = self.get_commitment(id).await?;
        ensure_mutable(&commitment)?;
        let read = CommitmentVersion::of(&commitment);

        let patch = patch.normalized()?;

        if let Some(number) = patch.number {
            if number != commitment.number {
                if self.store.commitment_number_taken(&number).await? {
                    return Err(CoreError::DuplicateKey {
                        field: "number",
                        value: number,
                    });
                }
                commitment.number = number;
            }
        }
        if let Some(supplier_id) = patch.supplier_id {
            if self.store.find_supplier(supplier_id).await?.is_none() {
                return Err(not_found("supplier", supplier_id));
            }
            commitment.supplier_id = supplier_id;
        }
        if let Some(payer_name) = patch.payer_name {
            commitment.payer_name = payer_name;
        }
        if let Some(payer_tax_id) = patch.payer_tax_id {
            commitment.payer_tax_id = payer_tax_id;
        }
        if let Some(description) = patch.description {
            commitment.description = description;
        }
        if let Some(due_date) = patch.due_date {
            commitment.due_date = due_date;
        }
        if let Some(notes) = patch.notes {
            commitment.notes = notes;
        }

        let increase = patch
            .amount
            .map(|amount| amount - commitment.amount)
            .filter(|delta| *delta > Decimal::ZERO);
        if let Some(amount) = patch.amount {
            commitment.amount = amount;
        }
        commitment.updated_at = Utc::now();

        match (commitment.contract_id, increase) {
            (Some(contract_id), Some(delta)) => {
                let _guard = self.serialize_contract(contract_id).await;

                // A contract removed after the commitment was created no
                // longer constrains it.
                check_budget(
                    &*self.store,
                    contract_id,
                    delta,
                    MissingContractPolicy::SkipEnforcement,
                )
                .await?;
                self.write_commitment(&commitment, read).await?;
            }
            _ => self.write_commitment(&commitment, read).await?,
        }

        info!(commitment_id = %commitment.id, "commitment updated");

        let audit = AuditEntry::new(
            actor,
            AuditAction::Update,
            EntityKind::Commitment,
            commitment.id,
            format!("Empenho {} atualizado", commitment.number),
        );

        Ok(Recorded::new(commitment, audit))
    }

    pub async fn delete_commitment(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<Recorded<()>, CoreError> {
        let mut commitment = self.get_commitment(id).await?;
        ensure_mutable(&commitment)?;
        let read = CommitmentVersion::of(&commitment);

        commitment.deleted = true;
        commitment.updated_at = Utc::now();
        self.write_commitment(&commitment, read).await?;

        info!(commitment_id = %commitment.id, "commitment soft-deleted");

        let audit = AuditEntry::new(
            actor,
            AuditAction::Delete,
            EntityKind::Commitment,
            commitment.id,
            format!("Empenho {} excluído", commitment.number),
        );

        Ok(Recorded::new((), audit))
    }
}

impl PaymentControl {
    /// Persists `commitment` only if the stored row is still the one that was
    /// `read`. A concurrent payment surfaces as `ImmutableState`, a concurrent
    /// deletion as `NotFound`, any other change as `ConcurrentUpdate`.
    async fn write_commitment(
        &self,
        commitment: &Commitment,
        read: CommitmentVersion,
    ) -> Result<(), CoreError> {
        if self.store.update_commitment(commitment, read).await? {
            return Ok(());
        }

        let current = self.get_commitment(commitment.id).await?;
        ensure_mutable(&current)?;
        warn!(
            commitment_id = %commitment.id,
            read_status = %read.status,
            found_status = %current.status,
            "commitment changed underneath a write"
        );
        Err(CoreError::ConcurrentUpdate {
            entity: "commitment",
            id: commitment.id,
        })
    }
}

fn build_commitment(actor: &Actor, input: NewCommitment, contract_id: Option<Uuid>) -> Commitment {
    let now = Utc::now();

    Commitment {
        id: Uuid::new_v4(),
        number: input.number,
        supplier_id: input.supplier_id,
        has_contract: contract_id.is_some(),
        contract_id,
        payer_name: input.payer_name,
        payer_tax_id: input.payer_tax_id,
        description: input.description,
        amount: input.amount,
        due_date: input.due_date,
        notes: input.notes,
        created_by: actor.user_id,
        status: CommitmentStatus::UnderEvaluation,
        created_at: now,
        updated_at: now,
        deleted: false,
    }
}
