//! Per-key async locks.
//!
//! Operations touching a table and an order take the table lock first, then
//! the order lock. Across processes the store's version checks still apply.

use std::sync::Arc;

use common::AggregateId;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    Table(AggregateId),
    Order(AggregateId),

    /// Guards uniqueness of a table number while a table is created.
    TableNumber(u32),
}

#[derive(Clone, Default)]
pub struct LockManager {
    locks: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`. Released when the guard drops.
    pub async fn acquire(&self, key: LockKey) -> OwnedMutexGuard<()> {
        let mutex = Arc::clone(self.locks.entry(key).or_default().value());
        mutex.lock_owned().await
    }

    /// Locks a table and then one of its orders.
    pub async fn acquire_table_and_order(
        &self,
        table_id: AggregateId,
        order_id: AggregateId,
    ) -> (OwnedMutexGuard<()>, OwnedMutexGuard<()>) {
        let table = self.acquire(LockKey::Table(table_id)).await;
        let order = self.acquire(LockKey::Order(order_id)).await;
        (table, order)
    }

    /// Number of keys ever locked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
