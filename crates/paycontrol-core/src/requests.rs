use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::ContractStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommitment {
    pub number: String,
    pub supplier_id: Uuid,
    #[serde(default)]
    pub has_contract: bool,
    pub contract_id: Option<Uuid>,
    pub payer_name: String,
    pub payer_tax_id: String,
    pub description: String,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewCommitment {
    /// Trims text fields and checks the mandatory ones. A contract id sent
    /// without `has_contract` is dropped.
    pub fn normalized(self) -> Result<Self, CoreError> {
        let contract_id = if self.has_contract {
            Some(self.contract_id.ok_or_else(|| {
                CoreError::validation("contract_id is required when has_contract is set")
            })?)
        } else {
            None
        };

        Ok(Self {
            number: required(&self.number, "number")?,
            supplier_id: self.supplier_id,
            has_contract: self.has_contract,
            contract_id,
            payer_name: required(&self.payer_name, "payer_name")?,
            payer_tax_id: required(&self.payer_tax_id, "payer_tax_id")?,
            description: required(&self.description, "description")?,
            amount: money(self.amount, "amount")?,
            due_date: self.due_date,
            notes: optional_text(self.notes),
        })
    }
}

/// Field edits of a commitment. Status and the contract link are not
/// editable here.
///
/// Optional fields take `Some(None)` to clear: an explicit `null` or, for
/// text, a blank string. An absent field is left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitmentPatch {
    pub number: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub payer_name: Option<String>,
    pub payer_tax_id: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "clearable")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "clearable")]
    pub notes: Option<Option<String>>,
}

impl CommitmentPatch {
    pub fn normalized(self) -> Result<Self, CoreError> {
        Ok(Self {
            number: self.number.map(|v| required(&v, "number")).transpose()?,
            supplier_id: self.supplier_id,
            payer_name: self
                .payer_name
                .map(|v| required(&v, "payer_name"))
                .transpose()?,
            payer_tax_id: self
                .payer_tax_id
                .map(|v| required(&v, "payer_tax_id"))
                .transpose()?,
            description: self
                .description
                .map(|v| required(&v, "description"))
                .transpose()?,
            amount: self.amount.map(|v| money(v, "amount")).transpose()?,
            due_date: self.due_date,
            notes: self.notes.map(optional_text),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplier {
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
}

impl NewSupplier {
    pub fn normalized(self) -> Result<Self, CoreError> {
        Ok(Self {
            legal_name: required(&self.legal_name, "legal_name")?,
            trade_name: optional_text(self.trade_name),
            tax_id: required(&self.tax_id, "tax_id")?,
            address: optional_text(self.address),
            phone: optional_text(self.phone),
            email: optional_text(self.email),
            bank: optional_text(self.bank),
            branch: optional_text(self.branch),
            account: optional_text(self.account),
            account_type: optional_text(self.account_type),
        })
    }
}

/// Same clearing rules as [`CommitmentPatch`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupplierPatch {
    pub legal_name: Option<String>,
    #[serde(default, deserialize_with = "clearable")]
    pub trade_name: Option<Option<String>>,
    pub tax_id: Option<String>,
    #[serde(default, deserialize_with = "clearable")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub bank: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub branch: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub account: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub account_type: Option<Option<String>>,
    pub active: Option<bool>,
}

impl SupplierPatch {
    pub fn normalized(self) -> Result<Self, CoreError> {
        Ok(Self {
            legal_name: self
                .legal_name
                .map(|v| required(&v, "legal_name"))
                .transpose()?,
            tax_id: self.tax_id.map(|v| required(&v, "tax_id")).transpose()?,
            trade_name: self.trade_name.map(optional_text),
            address: self.address.map(optional_text),
            phone: self.phone.map(optional_text),
            email: self.email.map(optional_text),
            bank: self.bank.map(optional_text),
            branch: self.branch.map(optional_text),
            account: self.account.map(optional_text),
            account_type: self.account_type.map(optional_text),
            active: self.active,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContract {
    pub number: String,
    pub supplier_id: Uuid,
    pub subject: String,
    pub total_value: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<ContractStatus>,
}

impl NewContract {
    pub fn normalized(self) -> Result<Self, CoreError> {
        validate_period(self.start_date, self.end_date)?;

        Ok(Self {
            number: required(&self.number, "number")?,
            supplier_id: self.supplier_id,
            subject: required(&self.subject, "subject")?,
            total_value: money(self.total_value, "total_value")?,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractPatch {
    pub number: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub subject: Option<String>,
    pub total_value: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ContractStatus>,
}

impl ContractPatch {
    pub fn normalized(self) -> Result<Self, CoreError> {
        Ok(Self {
            number: self.number.map(|v| required(&v, "number")).transpose()?,
            supplier_id: self.supplier_id,
            subject: self.subject.map(|v| required(&v, "subject")).transpose()?,
            total_value: self
                .total_value
                .map(|v| money(v, "total_value"))
                .transpose()?,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

impl NewUser {
    pub fn normalized(self) -> Result<Self, CoreError> {
        Ok(Self {
            name: required(&self.name, "name")?,
            email: email(&self.email)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
}

impl UserPatch {
    pub fn normalized(self) -> Result<Self, CoreError> {
        Ok(Self {
            name: self.name.map(|v| required(&v, "name")).transpose()?,
            email: self.email.map(|v| email(&v)).transpose()?,
            active: self.active,
        })
    }
}

pub fn validate_period(start: NaiveDate, end: NaiveDate) -> Result<(), CoreError> {
    if end < start {
        return Err(CoreError::validation(
            "end_date must be on or after start_date",
        ));
    }

    Ok(())
}

fn required(value: &str, field: &str) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::validation(format!("{field} is required")));
    }

    Ok(value.to_string())
}

/// Largest amount a `NUMERIC(15, 2)` column holds.
pub const MAX_MONEY: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 2);

/// Positive, at most two decimal places, and within [`MAX_MONEY`].
fn money(value: Decimal, field: &str) -> Result<Decimal, CoreError> {
    if value <= Decimal::ZERO {
        return Err(CoreError::validation(format!(
            "{field} must be greater than zero"
        )));
    }
    if value.normalize().scale() > 2 {
        return Err(CoreError::validation(format!(
            "{field} must have at most two decimal places"
        )));
    }
    if value > MAX_MONEY {
        return Err(CoreError::validation(format!(
            "{field} must not exceed {MAX_MONEY}"
        )));
    }

    Ok(value)
}

fn email(value: &str) -> Result<String, CoreError> {
    let value = required(value, "email")?;
    if !value.contains('@') {
        return Err(CoreError::validation(format!("invalid email '{value}'")));
    }

    Ok(value.to_ascii_lowercase())
}

// Absent stays `None`; `null` becomes `Some(None)`.
fn clearable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
