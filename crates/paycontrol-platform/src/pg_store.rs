use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use paycontrol_core::{
    AuditAction, AuditEntry, AuditLog, AuditQuery, Commitment, CommitmentStatus, CommitmentStore,
    CommitmentVersion, Contract, ContractStatus, ContractStore, EntityKind, StatusTotals, Supplier,
    SupplierStore, UniqueViolation, User, UserStore,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

const SUPPLIER_COLUMNS: &str = r#"
    id, legal_name, trade_name, tax_id, address, phone, email, bank, branch, account,
    account_type, active, created_at, updated_at, deleted
"#;

const CONTRACT_COLUMNS: &str = r#"
    id, number, supplier_id, subject, total_value, start_date, end_date, status,
    created_at, updated_at, deleted
"#;

const COMMITMENT_COLUMNS: &str = r#"
    id, number, supplier_id, has_contract, contract_id, payer_name, payer_tax_id,
    description, amount, due_date, notes, created_by, status, created_at, updated_at, deleted
"#;

const USER_COLUMNS: &str = "id, name, email, active, created_at, updated_at, deleted";

/// Postgres-backed persistence for every record kind, audit trail included.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SupplierStore for PgStore {
    async fn insert_supplier(&self, supplier: &Supplier) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, legal_name, trade_name, tax_id, address, phone, email, bank, branch,
                account, account_type, active, created_at, updated_at, deleted
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(supplier.id)
        .bind(&supplier.legal_name)
        .bind(&supplier.trade_name)
        .bind(&supplier.tax_id)
        .bind(&supplier.address)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.bank)
        .bind(&supplier.branch)
        .bind(&supplier.account)
        .bind(&supplier.account_type)
        .bind(supplier.active)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .bind(supplier.deleted)
        .execute(&self.pool)
        .await
        .map_err(|err| write_error(err, "suppliers_tax_id_key", "tax_id", &supplier.tax_id))?;

        Ok(())
    }

    async fn update_supplier(&self, supplier: &Supplier) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE suppliers
            SET legal_name = $2,
                trade_name = $3,
                tax_id = $4,
                address = $5,
                phone = $6,
                email = $7,
                bank = $8,
                branch = $9,
                account = $10,
                account_type = $11,
                active = $12,
                updated_at = $13,
                deleted = $14
            WHERE id = $1
            "#,
        )
        .bind(supplier.id)
        .bind(&supplier.legal_name)
        .bind(&supplier.trade_name)
        .bind(&supplier.tax_id)
        .bind(&supplier.address)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.bank)
        .bind(&supplier.branch)
        .bind(&supplier.account)
        .bind(&supplier.account_type)
        .bind(supplier.active)
        .bind(supplier.updated_at)
        .bind(supplier.deleted)
        .execute(&self.pool)
        .await
        .map_err(|err| write_error(err, "suppliers_tax_id_key", "tax_id", &supplier.tax_id))?;

        ensure_updated(result.rows_affected(), "supplier", supplier.id)
    }

    async fn find_supplier(&self, id: Uuid) -> Result<Option<Supplier>> {
        let row = sqlx::query(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1 AND deleted = FALSE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(supplier_from_row).transpose()
    }

    async fn supplier_tax_id_taken(&self, tax_id: &str) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM suppliers WHERE tax_id = $1)",
        )
        .bind(tax_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>> {
        let rows = sqlx::query(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE deleted = FALSE ORDER BY legal_name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(supplier_from_row).collect()
    }

    async fn count_suppliers(&self) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM suppliers WHERE deleted = FALSE")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

#[async_trait]
impl ContractStore for PgStore {
    async fn insert_contract(&self, contract: &Contract) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contracts (
                id, number, supplier_id, subject, total_value, start_date, end_date, status,
                created_at, updated_at, deleted
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(contract.id)
        .bind(&contract.number)
        .bind(contract.supplier_id)
        .bind(&contract.subject)
        .bind(contract.total_value)
        .bind(contract.start_date)
        .bind(contract.end_date)
        .bind(contract.status.as_str())
        .bind(contract.created_at)
        .bind(contract.updated_at)
        .bind(contract.deleted)
        .execute(&self.pool)
        .await
        .map_err(|err| write_error(err, "contracts_number_key", "number", &contract.number))?;

        Ok(())
    }

    async fn update_contract(&self, contract: &Contract) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET number = $2,
                supplier_id = $3,
                subject = $4,
                total_value = $5,
                start_date = $6,
                end_date = $7,
                status = $8,
                updated_at = $9,
                deleted = $10
            WHERE id = $1
            "#,
        )
        .bind(contract.id)
        .bind(&contract.number)
        .bind(contract.supplier_id)
        .bind(&contract.subject)
        .bind(contract.total_value)
        .bind(contract.start_date)
        .bind(contract.end_date)
        .bind(contract.status.as_str())
        .bind(contract.updated_at)
        .bind(contract.deleted)
        .execute(&self.pool)
        .await
        .map_err(|err| write_error(err, "contracts_number_key", "number", &contract.number))?;

        ensure_updated(result.rows_affected(), "contract", contract.id)
    }

    async fn find_contract(&self, id: Uuid) -> Result<Option<Contract>> {
        let row = sqlx::query(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1 AND deleted = FALSE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(contract_from_row).transpose()
    }

    async fn contract_number_taken(&self, number: &str) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM contracts WHERE number = $1)",
        )
        .bind(number)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn list_contracts(&self) -> Result<Vec<Contract>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM contracts
            WHERE deleted = FALSE
            ORDER BY created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(contract_from_row).collect()
    }

    async fn count_contracts(&self) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contracts WHERE deleted = FALSE")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

#[async_trait]
impl CommitmentStore for PgStore {
    async fn insert_commitment(&self, commitment: &Commitment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO commitments (
                id, number, supplier_id, has_contract, contract_id, payer_name, payer_tax_id,
                description, amount, due_date, notes, created_by, status, created_at,
                updated_at, deleted
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(commitment.id)
        .bind(&commitment.number)
        .bind(commitment.supplier_id)
        .bind(commitment.has_contract)
        .bind(commitment.contract_id)
        .bind(&commitment.payer_name)
        .bind(&commitment.payer_tax_id)
        .bind(&commitment.description)
        .bind(commitment.amount)
        .bind(commitment.due_date)
        .bind(&commitment.notes)
        .bind(commitment.created_by)
        .bind(commitment.status.as_str())
        .bind(commitment.created_at)
        .bind(commitment.updated_at)
        .bind(commitment.deleted)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            write_error(err, "commitments_number_key", "number", &commitment.number)
        })?;

        Ok(())
    }

    async fn update_commitment(
        &self,
        commitment: &Commitment,
        expected: CommitmentVersion,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE commitments
            SET number = $2,
                supplier_id = $3,
                has_contract = $4,
                contract_id = $5,
                payer_name = $6,
                payer_tax_id = $7,
                description = $8,
                amount = $9,
                due_date = $10,
                notes = $11,
                status = $12,
                updated_at = $13,
                deleted = $14
            WHERE id = $1
              AND deleted = FALSE
              AND status <> 'PAGO'
              AND status = $15
              AND updated_at = $16
            "#,
        )
        .bind(commitment.id)
        .bind(&commitment.number)
        .bind(commitment.supplier_id)
        .bind(commitment.has_contract)
        .bind(commitment.contract_id)
        .bind(&commitment.payer_name)
        .bind(&commitment.payer_tax_id)
        .bind(&commitment.description)
        .bind(commitment.amount)
        .bind(commitment.due_date)
        .bind(&commitment.notes)
        .bind(commitment.status.as_str())
        .bind(commitment.updated_at)
        .bind(commitment.deleted)
        .bind(expected.status.as_str())
        .bind(expected.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            write_error(err, "commitments_number_key", "number", &commitment.number)
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_commitment(&self, id: Uuid) -> Result<Option<Commitment>> {
        let row = sqlx::query(&format!(
            "SELECT {COMMITMENT_COLUMNS} FROM commitments WHERE id = $1 AND deleted = FALSE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(commitment_from_row).transpose()
    }

    async fn commitment_number_taken(&self, number: &str) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM commitments WHERE number = $1)",
        )
        .bind(number)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn list_commitments(&self, status: Option<CommitmentStatus>) -> Result<Vec<Commitment>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COMMITMENT_COLUMNS}
            FROM commitments
            WHERE deleted = FALSE
              AND ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(status.map(CommitmentStatus::as_str))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(commitment_from_row).collect()
    }

    async fn committed_total(&self, contract_id: Uuid) -> Result<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM commitments
            WHERE contract_id = $1
              AND deleted = FALSE
            "#,
        )
        .bind(contract_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn status_totals(&self) -> Result<Vec<StatusTotals>> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(amount), 0) AS value
            FROM commitments
            WHERE deleted = FALSE
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<StatusTotals> {
                let status: String = row.try_get("status")?;
                Ok(StatusTotals {
                    status: status.parse()?,
                    count: row.try_get("count")?,
                    value: row.try_get("value")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, active, created_at, updated_at, deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.deleted)
        .execute(&self.pool)
        .await
        .map_err(|err| write_error(err, "users_email_key", "email", &user.email))?;

        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2,
                email = $3,
                active = $4,
                updated_at = $5,
                deleted = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.active)
        .bind(user.updated_at)
        .bind(user.deleted)
        .execute(&self.pool)
        .await
        .map_err(|err| write_error(err, "users_email_key", "email", &user.email))?;

        ensure_updated(result.rows_affected(), "user", user.id)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted = FALSE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_email_taken(&self, email: &str) -> Result<bool> {
        let taken =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(taken)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted = FALSE ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }
}

#[async_trait]
impl AuditLog for PgStore {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, actor, action, entity, entity_id, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.actor)
        .bind(entry.action.as_str())
        .bind(entry.entity.as_str())
        .bind(entry.entity_id)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .context("failed to write audit entry")?;

        Ok(())
    }

    async fn list(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, actor, action, entity, entity_id, details, created_at
            FROM audit_log
            WHERE ($1::TEXT IS NULL OR entity = $1)
              AND ($2::TEXT IS NULL OR action = $2)
              AND ($3::UUID IS NULL OR entity_id = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(query.entity.map(EntityKind::as_str))
        .bind(query.action.map(AuditAction::as_str))
        .bind(query.entity_id)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(audit_from_row).collect()
    }
}

/// Turns a failure on the `constraint` unique key into [`UniqueViolation`].
fn write_error(
    err: sqlx::Error,
    constraint: &str,
    field: &'static str,
    value: &str,
) -> anyhow::Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() && db.constraint() == Some(constraint) {
            return UniqueViolation {
                field,
                value: value.to_string(),
            }
            .into();
        }
    }

    anyhow::Error::new(err)
}

fn ensure_updated(rows_affected: u64, entity: &str, id: Uuid) -> Result<()> {
    if rows_affected == 0 {
        return Err(anyhow!("{entity} {id} does not exist"));
    }
    Ok(())
}

fn supplier_from_row(row: &PgRow) -> Result<Supplier> {
    Ok(Supplier {
        id: row.try_get("id")?,
        legal_name: row.try_get("legal_name")?,
        trade_name: row.try_get("trade_name")?,
        tax_id: row.try_get("tax_id")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        bank: row.try_get("bank")?,
        branch: row.try_get("branch")?,
        account: row.try_get("account")?,
        account_type: row.try_get("account_type")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted: row.try_get("deleted")?,
    })
}

fn contract_from_row(row: &PgRow) -> Result<Contract> {
    let status: String = row.try_get("status")?;

    Ok(Contract {
        id: row.try_get("id")?,
        number: row.try_get("number")?,
        supplier_id: row.try_get("supplier_id")?,
        subject: row.try_get("subject")?,
        total_value: row.try_get("total_value")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        status: ContractStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown contract status '{status}'"))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted: row.try_get("deleted")?,
    })
}

fn commitment_from_row(row: &PgRow) -> Result<Commitment> {
    let status: String = row.try_get("status")?;

    Ok(Commitment {
        id: row.try_get("id")?,
        number: row.try_get("number")?,
        supplier_id: row.try_get("supplier_id")?,
        has_contract: row.try_get("has_contract")?,
        contract_id: row.try_get("contract_id")?,
        payer_name: row.try_get("payer_name")?,
        payer_tax_id: row.try_get("payer_tax_id")?,
        description: row.try_get("description")?,
        amount: row.try_get("amount")?,
        due_date: row.try_get("due_date")?,
        notes: row.try_get("notes")?,
        created_by: row.try_get("created_by")?,
        status: status.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted: row.try_get("deleted")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted: row.try_get("deleted")?,
    })
}

fn audit_from_row(row: &PgRow) -> Result<AuditEntry> {
    let action: String = row.try_get("action")?;
    let entity: String = row.try_get("entity")?;

    Ok(AuditEntry {
        id: row.try_get("id")?,
        actor: row.try_get("actor")?,
        action: AuditAction::parse(&action)
            .ok_or_else(|| anyhow!("unknown audit action '{action}'"))?,
        entity: EntityKind::parse(&entity)
            .ok_or_else(|| anyhow!("unknown audit entity '{entity}'"))?,
        entity_id: row.try_get("entity_id")?,
        details: row.try_get("details")?,
        created_at: row.try_get("created_at")?,
    })
}
