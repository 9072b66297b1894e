use crate::bus::MediaAttachment;
use crate::errors::{RelayError, RelayResult};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// One media attachment waiting for a possible caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingItem {
    id: u64,
    pub sender_id: String,
    pub username: String,
    pub media: MediaAttachment,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingItem {
    /// Build an item. The store assigns the identity on insert.
    pub fn new(sender_id: String, username: String, media: MediaAttachment) -> Self {
        Self {
            id: 0,
            sender_id,
            username,
            media,
            caption: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Result of [`PendingStore::swap`].
#[derive(Debug)]
pub struct Insertion {
    /// The item previously pending for the same sender, if any.
    pub displaced: Option<PendingItem>,
    /// Whether the caller must arm the flush timer.
    pub arm: bool,
}

#[derive(Default)]
struct Inner {
    items: VecDeque<PendingItem>,
    armed: bool,
    next_id: u64,
}

impl Inner {
    fn position(&self, sender_id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.sender_id == sender_id)
    }

    fn push(&mut self, mut item: PendingItem) -> bool {
        self.next_id += 1;
        item.id = self.next_id;
        self.items.push_back(item);
        if self.armed {
            false
        } else {
            self.armed = true;
            true
        }
    }
}

/// Pending media items, at most one per sender, in insertion order.
///
/// Every operation takes the single lock for its whole duration and never
/// awaits while holding it. The `armed` flag tracks the shared flush timer
/// and is cleared by [`drain_all`](Self::drain_all) in the same critical
/// section that empties the store.
#[derive(Default)]
pub struct PendingStore {
    inner: Mutex<Inner>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn find_by_sender(&self, sender_id: &str) -> Option<PendingItem> {
        let inner = self.lock();
        inner
            .position(sender_id)
            .and_then(|idx| inner.items.get(idx).cloned())
    }

    /// Insert an item for a sender with nothing pending.
    ///
    /// Returns `true` when this insert armed the timer. Fails with
    /// [`RelayError::ConcurrencyViolation`] if the sender already has an item;
    /// the store is left unchanged in that case.
    pub fn insert(&self, item: PendingItem) -> RelayResult<bool> {
        let mut inner = self.lock();
        if inner.position(&item.sender_id).is_some() {
            return Err(RelayError::ConcurrencyViolation {
                sender_id: item.sender_id,
            });
        }
        Ok(inner.push(item))
    }

    /// Remove by identity. Does not touch the timer.
    pub fn remove(&self, id: u64) -> Option<PendingItem> {
        let mut inner = self.lock();
        let idx = inner.items.iter().position(|i| i.id == id)?;
        inner.items.remove(idx)
    }

    /// Remove and return the item pending for `sender_id`, if any.
    pub fn take_by_sender(&self, sender_id: &str) -> Option<PendingItem> {
        let mut inner = self.lock();
        let idx = inner.position(sender_id)?;
        inner.items.remove(idx)
    }

    /// Replace whatever is pending for the item's sender with `item`.
    pub fn swap(&self, item: PendingItem) -> Insertion {
        let mut inner = self.lock();
        let displaced = inner
            .position(&item.sender_id)
            .and_then(|idx| inner.items.remove(idx));
        let arm = inner.push(item);
        Insertion { displaced, arm }
    }

    /// Empty the store in insertion order and disarm the timer.
    pub fn drain_all(&self) -> Vec<PendingItem> {
        let mut inner = self.lock();
        inner.armed = false;
        inner.items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_armed(&self) -> bool {
        self.lock().armed
    }
}
