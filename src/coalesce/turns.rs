use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-sender delivery turns.
///
/// Holding a sender's turn keeps every other delivery for that sender
/// waiting, so a sender's messages reach Discord in the order their turns
/// were taken. Waiters are served first come, first served.
#[derive(Default)]
pub struct SenderTurns {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SenderTurns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for `sender_id`'s turn. The turn ends when the guard is dropped.
    pub async fn acquire(&self, sender_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(sender_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
