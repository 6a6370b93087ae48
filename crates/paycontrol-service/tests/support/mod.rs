#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use paycontrol_core::{
    Actor, Commitment, Contract, NewCommitment, NewContract, NewSupplier, Supplier,
};
use paycontrol_service::{PaymentControl, ServiceOptions};
use paycontrol_store::InMemoryStore;
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn amount(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}

pub fn actor() -> Actor {
    Actor::new(Uuid::new_v4(), "Joana Ribeiro")
}

pub fn service(options: ServiceOptions) -> PaymentControl {
    PaymentControl::new(Arc::new(InMemoryStore::new()), options)
}

pub async fn supplier(service: &PaymentControl, tax_id: &str) -> Supplier {
    service
        .create_supplier(
            &actor(),
            NewSupplier {
                legal_name: format!("Fornecedor {tax_id}"),
                trade_name: None,
                tax_id: tax_id.to_string(),
                address: None,
                phone: None,
                email: None,
                bank: Some("001".to_string()),
                branch: Some("1234-5".to_string()),
                account: Some("99887-6".to_string()),
                account_type: Some("CORRENTE".to_string()),
            },
        )
        .await
        .expect("supplier created")
        .value
}

pub async fn contract(
    service: &PaymentControl,
    supplier: &Supplier,
    number: &str,
    total: &str,
) -> Contract {
    service
        .create_contract(
            &actor(),
            NewContract {
                number: number.to_string(),
                supplier_id: supplier.id,
                subject: "Fornecimento de merenda escolar".to_string(),
                total_value: amount(total),
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
                end_date: NaiveDate::from_ymd_opt(2024, 12, 31).expect("date"),
                status: None,
            },
        )
        .await
        .expect("contract created")
        .value
}

pub fn new_commitment(
    supplier: &Supplier,
    number: &str,
    contract: Option<&Contract>,
    value: &str,
) -> NewCommitment {
    NewCommitment {
        number: number.to_string(),
        supplier_id: supplier.id,
        has_contract: contract.is_some(),
        contract_id: contract.map(|c| c.id),
        payer_name: "Secretaria Municipal de Educação".to_string(),
        payer_tax_id: "11.222.333/0001-44".to_string(),
        description: "Empenho ordinário".to_string(),
        amount: amount(value),
        due_date: None,
        notes: None,
    }
}

pub async fn commitment(
    service: &PaymentControl,
    supplier: &Supplier,
    number: &str,
    contract: Option<&Contract>,
    value: &str,
) -> Commitment {
    service
        .create_commitment(&actor(), new_commitment(supplier, number, contract, value))
        .await
        .expect("commitment created")
        .value
}
