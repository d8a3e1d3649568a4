//! # Primary Key Allocator
//!
//! One monotonically increasing counter per mapped type. Counters of
//! different types live in separate map shards and never contend; callers
//! of the same type are linearized by a single atomic increment.

use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

#[derive(Debug, Default)]
pub(crate) struct KeyAllocator {
    counters: DashMap<TypeId, Arc<AtomicI64>>,
}

impl KeyAllocator {
    fn counter(&self, type_id: TypeId) -> Option<Arc<AtomicI64>> {
        self.counters.get(&type_id).map(|c| Arc::clone(c.value()))
    }

    /// Sets the high-water mark of a type, typically the largest stored key.
    pub(crate) fn seed(&self, type_id: TypeId, value: i64) {
        match self.counter(type_id) {
            Some(counter) => counter.store(value, Ordering::SeqCst),
            None => {
                self.counters.insert(type_id, Arc::new(AtomicI64::new(value)));
            }
        }
    }

    /// Returns `true` once the type has been seeded or allocated from.
    pub(crate) fn is_seeded(&self, type_id: TypeId) -> bool {
        self.counters.contains_key(&type_id)
    }

    /// Returns the next key of a type. An unseeded type starts from 0.
    pub(crate) fn next(&self, type_id: TypeId) -> i64 {
        let counter = match self.counter(type_id) {
            Some(counter) => counter,
            None => Arc::clone(self.counters.entry(type_id).or_default().value()),
        };
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn reset(&self, type_id: TypeId) {
        self.seed(type_id, 0);
    }

    pub(crate) fn clear(&self) {
        self.counters.clear();
    }
}

