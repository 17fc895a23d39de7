//! Transaction correlation table.
//!
//! Maps transaction ids to pending entries for one connection. Every
//! operation takes the same lock for the duration of a single map access, so
//! operations on one id are linearizable: a `resolve` racing a `cancel` has
//! exactly one winner. The lock is never held across an await point.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use plcprims_field::TransactionId;

use crate::error::TableError;

struct Inner<T> {
    entries: HashMap<TransactionId, T>,
    next: TransactionId,
}

/// Concurrency-safe store of in-flight requests keyed by transaction id.
///
/// Ids are allocated from a counter over `1..=ceiling` that wraps back to 1.
/// An id still held by a pending entry is skipped, so allocation only fails
/// when every id in the range is occupied.
pub struct CorrelationTable<T> {
    inner: Mutex<Inner<T>>,
    ceiling: TransactionId,
}

impl<T> CorrelationTable<T> {
    /// Table using the full 16-bit id space.
    pub fn new() -> Self {
        Self::with_ceiling(TransactionId::MAX)
    }

    /// Table whose ids wrap after `ceiling` (at least 1).
    pub fn with_ceiling(ceiling: TransactionId) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                next: 1,
            }),
            ceiling: ceiling.max(1),
        }
    }

    pub fn ceiling(&self) -> TransactionId {
        self.ceiling
    }

    /// Allocate the next free id and insert the entry built for it.
    pub fn register(
        &self,
        make: impl FnOnce(TransactionId) -> T,
    ) -> Result<TransactionId, TableError> {
        let mut inner = self.lock();
        for _ in 0..self.ceiling {
            let id = inner.next;
            inner.next = if id >= self.ceiling { 1 } else { id + 1 };
            if !inner.entries.contains_key(&id) {
                inner.entries.insert(id, make(id));
                return Ok(id);
            }
        }
        Err(TableError::Duplicate(inner.next))
    }

    /// Insert under a caller-chosen id, refusing to overwrite.
    pub fn insert(&self, id: TransactionId, value: T) -> Result<(), TableError> {
        let mut inner = self.lock();
        if inner.entries.contains_key(&id) {
            return Err(TableError::Duplicate(id));
        }
        inner.entries.insert(id, value);
        Ok(())
    }

    /// Remove and return the entry for `id`; `None` marks an orphan.
    pub fn resolve(&self, id: TransactionId) -> Option<T> {
        self.lock().entries.remove(&id)
    }

    /// Remove the entry without a reply. Returns whether one existed.
    pub fn cancel(&self, id: TransactionId) -> bool {
        self.lock().entries.remove(&id).is_some()
    }

    /// Remove the entry for `id` only if `pred` accepts it.
    pub fn remove_if(&self, id: TransactionId, pred: impl FnOnce(&T) -> bool) -> Option<T> {
        let mut inner = self.lock();
        match inner.entries.get(&id) {
            Some(entry) if pred(entry) => inner.entries.remove(&id),
            _ => None,
        }
    }

    /// Remove every entry. Used when the connection shuts down.
    pub fn drain(&self) -> Vec<(TransactionId, T)> {
        self.lock().entries.drain().collect()
    }

    pub fn contains(&self, id: TransactionId) -> bool {
        self.lock().entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries stay consistent across a panicking holder: every critical
    // section is a single map call.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for CorrelationTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
