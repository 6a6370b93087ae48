//! Keeps the commitments linked to a contract within its authorized total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::storage::{CommitmentStore, ContractStore};

/// What to do when a commitment names a contract that does not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingContractPolicy {
    /// Fail with `NotFound`.
    #[default]
    Reject,
    /// Create the commitment without enforcement and without the link.
    SkipEnforcement,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetCheck {
    pub contract_id: Uuid,
    pub ceiling: Decimal,
    pub committed: Decimal,
    pub total_if_accepted: Decimal,
}

impl BudgetCheck {
    /// The ceiling itself is reachable.
    pub fn ok(&self) -> bool {
        self.total_if_accepted <= self.ceiling
    }

    pub fn into_result(self) -> Result<Self, CoreError> {
        if self.ok() {
            Ok(self)
        } else {
            Err(CoreError::BudgetExceeded {
                attempted: self.total_if_accepted,
                ceiling: self.ceiling,
            })
        }
    }
}

/// Fails with `Validation` when the sum cannot be represented.
pub fn evaluate(
    contract_id: Uuid,
    ceiling: Decimal,
    committed: Decimal,
    new_amount: Decimal,
) -> Result<BudgetCheck, CoreError> {
    let total_if_accepted = committed
        .checked_add(new_amount)
        .ok_or_else(|| CoreError::validation("amount is out of range"))?;

    Ok(BudgetCheck {
        contract_id,
        ceiling,
        committed,
        total_if_accepted,
    })
}

/// Reads the contract and its committed sum, then decides. Returns `None`
/// when the contract is missing and the policy skips enforcement.
///
/// The read and the caller's later insert are not atomic; callers that need
/// the ceiling to hold under concurrency must serialize per contract.
pub async fn check_budget<S>(
    store: &S,
    contract_id: Uuid,
    new_amount: Decimal,
    policy: MissingContractPolicy,
) -> Result<Option<BudgetCheck>, CoreError>
where
    S: ContractStore + CommitmentStore + ?Sized,
{
    let Some(contract) = store.find_contract(contract_id).await? else {
        return match policy {
            MissingContractPolicy::Reject => Err(CoreError::NotFound {
                entity: "contract",
                id: contract_id,
            }),
            MissingContractPolicy::SkipEnforcement => Ok(None),
        };
    };

    let committed = store.committed_total(contract_id).await?;
    evaluate(contract_id, contract.total_value, committed, new_amount)?
        .into_result()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn ceiling_is_inclusive() {
        let id = Uuid::new_v4();
        let check = evaluate(id, amount("1000.00"), Decimal::ZERO, amount("1000.00")).unwrap();
        assert!(check.ok());
        assert_eq!(check.total_if_accepted, amount("1000.00"));

        let over = evaluate(id, amount("1000.00"), Decimal::ZERO, amount("1000.01")).unwrap();
        assert!(!over.ok());
    }

    #[test]
    fn existing_commitments_count_against_the_ceiling() {
        let id = Uuid::new_v4();
        let within = evaluate(id, amount("500.00"), amount("300.00"), amount("200.00")).unwrap();
        assert!(within.ok());

        let err = evaluate(id, amount("500.00"), amount("300.00"), amount("200.01"))
            .and_then(BudgetCheck::into_result)
            .unwrap_err();
        match err {
            CoreError::BudgetExceeded { attempted, ceiling } => {
                assert_eq!(attempted, amount("500.01"));
                assert_eq!(ceiling, amount("500.00"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn repeated_cents_do_not_drift() {
        let id = Uuid::new_v4();
        let committed = (0..10).fold(Decimal::ZERO, |acc, _| acc + amount("0.10"));
        assert!(evaluate(id, amount("1.00"), committed, Decimal::ZERO).unwrap().ok());
        assert!(!evaluate(id, amount("1.00"), committed, amount("0.01")).unwrap().ok());
    }

    #[test]
    fn unrepresentable_totals_are_rejected() {
        let err = evaluate(Uuid::new_v4(), amount("1000.00"), Decimal::MAX, amount("1.00"))
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }
}
