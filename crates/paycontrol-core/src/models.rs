use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a payment commitment ("empenho").
///
/// The wire and storage representation is the uppercase code used by the
/// municipal back office (`EM_AVALIACAO`, `APROVADO`, ...).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CommitmentStatus {
    #[serde(rename = "EM_AVALIACAO")]
    UnderEvaluation,
    #[serde(rename = "APROVADO")]
    Approved,
    #[serde(rename = "REPROVADO")]
    Rejected,
    #[serde(rename = "PAGO")]
    Paid,
    #[serde(rename = "CANCELADO")]
    Cancelled,
}

/// Administrative state of a contract. Only used for filtering; the budget
/// guard does not look at it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ContractStatus {
    #[default]
    #[serde(rename = "ATIVO")]
    Active,
    #[serde(rename = "ENCERRADO")]
    Closed,
    #[serde(rename = "SUSPENSO")]
    Suspended,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Active => "ATIVO",
            ContractStatus::Closed => "ENCERRADO",
            ContractStatus::Suspended => "SUSPENSO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ATIVO" => Some(ContractStatus::Active),
            "ENCERRADO" => Some(ContractStatus::Closed),
            "SUSPENSO" => Some(ContractStatus::Suspended),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Supplier {
    pub id: Uuid,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub tax_id: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub bank: Option<String>,
    pub branch: Option<String>,
    pub account: Option<String>,
    pub account_type: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contract {
    pub id: Uuid,
    pub number: String,
    pub supplier_id: Uuid,
    pub subject: String,
    pub total_value: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

/// A payment commitment reserved against public funds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Commitment {
    pub id: Uuid,
    pub number: String,
    pub supplier_id: Uuid,
    pub has_contract: bool,
    pub contract_id: Option<Uuid>,
    pub payer_name: String,
    pub payer_tax_id: String,
    pub description: String,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub status: CommitmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

/// Back-office staff member. Credentials live with the authentication
/// provider, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

/// Count and value of the non-deleted commitments in one status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusTotals {
    pub status: CommitmentStatus,
    pub count: i64,
    pub value: Decimal,
}
