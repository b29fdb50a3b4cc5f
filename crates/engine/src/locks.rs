//! In-process serialization of settlements per (payer, payee) direction.
//!
//! A settlement from A to B only ever touches splits A owes on expenses B
//! paid, so two settlements contend only when they share a direction. The
//! database-level compare-and-set in the allocator still guards writers in
//! other processes; this lock keeps writers in this process from tripping it.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub(crate) struct PairLocks {
    inner: Mutex<HashMap<(i64, i64), Arc<AsyncMutex<()>>>>,
}

impl PairLocks {
    /// Waits for exclusive access to the `from -> to` direction.
    pub(crate) async fn lock(&self, from: i64, to: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds or waits on.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(map.entry((from, to)).or_default())
        };
        lock.lock_owned().await
    }
}
