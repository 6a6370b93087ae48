use chrono::Utc;
use paycontrol_core::{
    Actor, AuditAction, AuditEntry, CoreError, EntityKind, NewSupplier, Recorded, Supplier,
    SupplierPatch,
};
use tracing::info;
use uuid::Uuid;

use crate::{PaymentControl, not_found};

impl PaymentControl {
    pub async fn get_supplier(&self, id: Uuid) -> Result<Supplier, CoreError> {
        self.store
            .find_supplier(id)
            .await?
            .ok_or_else(|| not_found("supplier", id))
    }

    pub async fn list_suppliers(&self) -> Result<Vec<Supplier>, CoreError> {
        Ok(self.store.list_suppliers().await?)
    }

    pub async fn create_supplier(
        &self,
        actor: &Actor,
        input: NewSupplier,
    ) -> Result<Recorded<Supplier>, CoreError> {
        let input = input.normalized()?;

        if self.store.supplier_tax_id_taken(&input.tax_id).await? {
            return Err(CoreError::DuplicateKey {
                field: "tax_id",
                value: input.tax_id,
            });
        }

        let now = Utc::now();
        let supplier = Supplier {
            id: Uuid::new_v4(),
            legal_name: input.legal_name,
            trade_name: input.trade_name,
            tax_id: input.tax_id,
            address: input.address,
            phone: input.phone,
            email: input.email,
            bank: input.bank,
            branch: input.branch,
            account: input.account,
            account_type: input.account_type,
            active: true,
            created_at: now,
            updated_at: now,
            deleted: false,
        };
        self.store.insert_supplier(&supplier).await?;

        info!(supplier_id = %supplier.id, "supplier created");

        let audit = AuditEntry::new(
            actor,
            AuditAction::Create,
            EntityKind::Supplier,
            supplier.id,
            format!("Fornecedor criado: {}", supplier.legal_name),
        );

        Ok(Recorded::new(supplier, audit))
    }

    pub async fn update_supplier(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: SupplierPatch,
    ) -> Result<Recorded<Supplier>, CoreError> {
        let mut supplier = self.get_supplier(id).await?;
        let patch = patch.normalized()?;

        if let Some(tax_id) = patch.tax_id {
            if tax_id != supplier.tax_id {
                if self.store.supplier_tax_id_taken(&tax_id).await? {
                    return Err(CoreError::DuplicateKey {
                        field: "tax_id",
                        value: tax_id,
                    });
                }
                supplier.tax_id = tax_id;
            }
        }
        if let Some(legal_name) = patch.legal_name {
            supplier.legal_name = legal_name;
        }
        for (slot, value) in [
            (&mut supplier.trade_name, patch.trade_name),
            (&mut supplier.address, patch.address),
            (&mut supplier.phone, patch.phone),
            (&mut supplier.email, patch.email),
            (&mut supplier.bank, patch.bank),
            (&mut supplier.branch, patch.branch),
            (&mut supplier.account, patch.account),
            (&mut supplier.account_type, patch.account_type),
        ] {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(active) = patch.active {
            supplier.active = active;
        }
        supplier.updated_at = Utc::now();

        self.store.update_supplier(&supplier).await?;

        let audit = AuditEntry::new(
            actor,
            AuditAction::Update,
            EntityKind::Supplier,
            supplier.id,
            format!("Fornecedor atualizado: {}", supplier.legal_name),
        );

        Ok(Recorded::new(supplier, audit))
    }

    pub async fn delete_supplier(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<Recorded<()>, CoreError> {
        let mut supplier = self.get_supplier(id).await?;
        supplier.deleted = true;
        supplier.updated_at = Utc::now();
        self.store.update_supplier(&supplier).await?;

        info!(supplier_id = %supplier.id, "supplier soft-deleted");

        let audit = AuditEntry::new(
            actor,
            AuditAction::Delete,
            EntityKind::Supplier,
            supplier.id,
            format!("Fornecedor excluído: {}", supplier.legal_name),
        );

        Ok(Recorded::new((), audit))
    }
}
