use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-customer async locks. Every cart mutation and checkout for a customer
/// runs while holding that customer's lock, so they are serialized within
/// this process. Cross-process ordering comes from `SELECT ... FOR UPDATE`
/// on the cart row (Postgres only).
///
/// Entries only live while a guard is held or awaited, so the map stays as
/// large as the number of customers with a request in flight.
#[derive(Debug, Clone, Default)]
pub struct CustomerLocks {
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

/// Holds a customer's lock; releases it and prunes the map entry on drop.
pub struct CustomerLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    customer_id: Uuid,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl CustomerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, customer_id: Uuid) -> CustomerLockGuard {
        let mutex = self
            .locks
            .entry(customer_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        CustomerLockGuard {
            guard: Some(mutex.lock_owned().await),
            customer_id,
            locks: self.locks.clone(),
        }
    }

    /// Number of customers with a lock held or awaited
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for CustomerLockGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Cloning a mutex out of the map and this check both hold the shard
        // lock, so a count of one means nobody holds or awaits it.
        self.locks
            .remove_if(&self.customer_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_customer_is_serialized() {
        let locks = CustomerLocks::new();
        let customer = Uuid::new_v4();

        let guard = locks.lock(customer).await;
        let waiting = tokio::time::timeout(Duration::from_millis(50), locks.lock(customer)).await;
        assert!(waiting.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(50), locks.lock(customer)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn different_customers_do_not_block_each_other() {
        let locks = CustomerLocks::new();
        let _first = locks.lock(Uuid::new_v4()).await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(Uuid::new_v4())).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn released_locks_are_pruned() {
        let locks = CustomerLocks::new();
        let customer = Uuid::new_v4();

        let guard = locks.lock(customer).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(customer).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(locks.tracked(), 1);

        // The waiter still holds a reference, so the entry survives this drop
        drop(guard);
        waiter.await.unwrap();
        assert_eq!(locks.tracked(), 0);

        for _ in 0..100 {
            drop(locks.lock(Uuid::new_v4()).await);
        }
        assert_eq!(locks.tracked(), 0);
    }
}
