use chrono::{DateTime, Utc};
use paycontrol_core::{CommitmentStatus, CoreError, StatusTotals};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PaymentControl;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub generated_at: DateTime<Utc>,
    pub suppliers_total: i64,
    pub contracts_total: i64,
    pub commitments_total: i64,
    pub commitments_value: Decimal,
    /// One row per status, zero-filled, in workflow order.
    pub by_status: Vec<StatusTotals>,
}

impl PaymentControl {
    pub async fn dashboard(&self) -> Result<DashboardSummary, CoreError> {
        let suppliers_total = self.store.count_suppliers().await?;
        let contracts_total = self.store.count_contracts().await?;
        let totals = self.store.status_totals().await?;

        let by_status: Vec<StatusTotals> = CommitmentStatus::ALL
            .into_iter()
            .map(|status| {
                totals
                    .iter()
                    .find(|row| row.status == status)
                    .cloned()
                    .unwrap_or(StatusTotals {
                        status,
                        count: 0,
                        value: Decimal::ZERO,
                    })
            })
            .collect();

        Ok(DashboardSummary {
            generated_at: Utc::now(),
            suppliers_total,
            contracts_total,
            commitments_total: by_status.iter().map(|row| row.count).sum(),
            commitments_value: by_status.iter().map(|row| row.value).sum(),
            by_status,
        })
    }
}
