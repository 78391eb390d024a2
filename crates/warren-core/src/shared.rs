//! State shared by every world of one manager.
//!
//! Exactly two things cross world boundaries: the episode-id counter and
//! the aggregate progress meter. Both are updated with atomic operations
//! so worlds advancing concurrently on different workers never require a
//! lock. Everything else a world touches is either owned by that world or
//! immutable (the asset table).

use crate::EpisodeId;
use std::sync::atomic::{AtomicU32, Ordering};

/// Manager-wide source of unique, monotonically increasing episode ids.
///
/// Every world reset draws the next id with a relaxed `fetch_add`. Ids are
/// never reused within the lifetime of the counter, regardless of how many
/// worlds reset in the same tick or which worker thread performs the draw.
#[derive(Debug, Default)]
pub struct EpisodeCounter {
    next: AtomicU32,
}

impl EpisodeCounter {
    /// Create a counter starting at episode 0.
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(0),
        }
    }

    /// Draw the next episode id. Thread-safe; each call returns a value
    /// never returned before by this counter.
    pub fn next(&self) -> EpisodeId {
        EpisodeId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of ids drawn so far.
    pub fn issued(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }
}

/// Manager-wide accumulator of forward progress across all worlds.
///
/// Stores `f32` bits in an `AtomicU32`; additions use a compare-exchange
/// loop, so concurrent contributions from worker threads are never lost.
/// Consumers read an aggregate training-progress signal, not a per-world
/// value.
#[derive(Debug, Default)]
pub struct ProgressMeter {
    bits: AtomicU32,
}

impl ProgressMeter {
    /// Create a meter at 0.0.
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    /// Atomically add `delta` to the running total.
    pub fn add(&self, delta: f32) {
        if delta == 0.0 {
            return;
        }
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let updated = (f32::from_bits(current) + delta).to_bits();
            match self.bits.compare_exchange_weak(
                current,
                updated,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Current running total.
    pub fn total(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}
