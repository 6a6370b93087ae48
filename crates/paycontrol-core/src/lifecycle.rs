//! Status workflow of a payment commitment.
//!
//! ```text
//! EM_AVALIACAO -> APROVADO | REPROVADO | CANCELADO
//! APROVADO     -> PAGO | CANCELADO
//! REPROVADO    -> EM_AVALIACAO | CANCELADO
//! PAGO, CANCELADO: terminal
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::{Commitment, CommitmentStatus};

const REASON_NOT_GIVEN: &str = "Não informado";

impl CommitmentStatus {
    pub const ALL: [CommitmentStatus; 5] = [
        CommitmentStatus::UnderEvaluation,
        CommitmentStatus::Approved,
        CommitmentStatus::Rejected,
        CommitmentStatus::Paid,
        CommitmentStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommitmentStatus::UnderEvaluation => "EM_AVALIACAO",
            CommitmentStatus::Approved => "APROVADO",
            CommitmentStatus::Rejected => "REPROVADO",
            CommitmentStatus::Paid => "PAGO",
            CommitmentStatus::Cancelled => "CANCELADO",
        }
    }

    /// States reachable in one step. Never contains `self`.
    pub fn allowed_next(self) -> &'static [CommitmentStatus] {
        use CommitmentStatus::*;

        match self {
            UnderEvaluation => &[Approved, Rejected, Cancelled],
            Approved => &[Paid, Cancelled],
            Rejected => &[UnderEvaluation, Cancelled],
            Paid | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, requested: CommitmentStatus) -> bool {
        self.allowed_next().contains(&requested)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl fmt::Display for CommitmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitmentStatus {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let code = value.trim();
        CommitmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == code)
            .ok_or_else(|| CoreError::UnknownStatus(value.to_string()))
    }
}

pub fn can_transition(current: CommitmentStatus, requested: CommitmentStatus) -> bool {
    current.can_transition_to(requested)
}

/// Rejects any mutation of a paid commitment. Runs before the transition
/// table for edits, deletes and status changes alike.
pub fn ensure_mutable(commitment: &Commitment) -> Result<(), CoreError> {
    if commitment.status == CommitmentStatus::Paid {
        return Err(CoreError::ImmutableState {
            number: commitment.number.clone(),
        });
    }

    Ok(())
}

/// An accepted status change, ready to be applied and audited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: CommitmentStatus,
    pub to: CommitmentStatus,
    pub reason: Option<String>,
}

impl StatusTransition {
    pub fn plan(
        current: CommitmentStatus,
        requested: CommitmentStatus,
        reason: Option<String>,
    ) -> Result<Self, CoreError> {
        if !can_transition(current, requested) {
            return Err(CoreError::InvalidTransition {
                from: current,
                to: requested,
            });
        }

        let reason = reason
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        Ok(Self {
            from: current,
            to: requested,
            reason,
        })
    }

    /// Text stored in the audit trail for this transition.
    pub fn describe(&self) -> String {
        format!(
            "Status alterado: {} → {}. Motivo: {}",
            self.from,
            self.to,
            self.reason.as_deref().unwrap_or(REASON_NOT_GIVEN)
        )
    }
}
