use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per contract. Holding the guard serializes the
/// "sum, decide, insert" sequence of the budget guard for that contract.
///
/// Slots nobody holds or waits on are dropped on the next acquire, so the
/// map only tracks contracts with work in flight.
#[derive(Default)]
pub(crate) struct ContractLocks {
    slots: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ContractLocks {
    pub(crate) async fn acquire(&self, contract_id: Uuid) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(contract_id).or_default())
        };

        slot.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.slots.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn idle_slots_are_released() {
        let locks = ContractLocks::default();
        let first = Uuid::new_v4();

        let held = locks.acquire(first).await;
        let _other = locks.acquire(Uuid::new_v4()).await;
        assert_eq!(locks.tracked().await, 2);

        drop(held);
        let _third = locks.acquire(Uuid::new_v4()).await;
        assert_eq!(locks.tracked().await, 2);
    }

    #[tokio::test]
    async fn same_contract_waits_for_the_holder() {
        let locks = Arc::new(ContractLocks::default());
        let contract_id = Uuid::new_v4();

        let held = locks.acquire(contract_id).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(contract_id).await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
    }
}
