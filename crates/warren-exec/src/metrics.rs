//! Per-tick metrics aggregated across all worlds.

use warren_sim::TickEvents;

/// What the last tick did, summed over every world.
///
/// Backends populate one record per `step()`; the manager exposes the
/// most recent one. Counters are per-tick, not cumulative.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Wall-clock time for the whole tick, in microseconds.
    pub total_us: u64,
    /// Worlds that advanced one physics step.
    pub worlds_advanced: u32,
    /// Worlds that reset into a fresh episode.
    pub worlds_reset: u32,
    /// Checkpoint blobs serialized this tick.
    pub checkpoints_saved: u32,
    /// Worlds restored from their blob this tick.
    pub checkpoints_loaded: u32,
    /// Load requests that hit an invalid blob and fell through to a
    /// normal advance.
    pub checkpoint_load_failures: u32,
    /// Episodes that ended this tick.
    pub episodes_completed: u32,
    /// Forward progress gained this tick, summed over all agents.
    pub progress_delta: f32,
}

impl StepMetrics {
    /// Fold one world's tick events into the totals.
    pub fn absorb(&mut self, ev: TickEvents) {
        self.worlds_advanced += ev.advanced as u32;
        self.worlds_reset += ev.reset as u32;
        self.checkpoints_saved += ev.checkpoint_saved as u32;
        self.checkpoints_loaded += ev.checkpoint_loaded as u32;
        self.checkpoint_load_failures += ev.checkpoint_load_failed as u32;
        self.episodes_completed += ev.episode_completed as u32;
        self.progress_delta += ev.progress_delta;
    }

    /// Fold another partition's totals into this one. `total_us` is not
    /// summed; partitions run concurrently and the caller owns the
    /// wall-clock measurement.
    pub fn merge(&mut self, other: &StepMetrics) {
        self.worlds_advanced += other.worlds_advanced;
        self.worlds_reset += other.worlds_reset;
        self.checkpoints_saved += other.checkpoints_saved;
        self.checkpoints_loaded += other.checkpoints_loaded;
        self.checkpoint_load_failures += other.checkpoint_load_failures;
        self.episodes_completed += other.episodes_completed;
        self.progress_delta += other.progress_delta;
    }
}
