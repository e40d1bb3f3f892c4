//! Sequence id allocation.

use std::sync::atomic::{AtomicU32, Ordering};

/// Lock-free allocator for request sequence ids.
///
/// Values increase by one and wrap past `u32::MAX`. Zero is never returned:
/// after wraparound the next value is 1. Share one allocator between sessions
/// with an `Arc` when ids must be unique across them.
#[derive(Debug)]
pub struct SequenceAllocator {
    next: AtomicU32,
}

impl SequenceAllocator {
    /// Allocator starting at 1
    #[must_use]
    pub const fn new() -> Self {
        Self::with_seed(1)
    }

    /// Allocator whose first value is `seed` (or 1 when `seed` is 0)
    #[must_use]
    pub const fn with_seed(seed: u32) -> Self {
        Self {
            next: AtomicU32::new(seed),
        }
    }

    /// Hand out the next sequence id
    pub fn next_value(&self) -> u32 {
        loop {
            let value = self.next.fetch_add(1, Ordering::Relaxed);
            if value != 0 {
                return value;
            }
        }
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}
