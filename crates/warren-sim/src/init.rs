//! Per-world initialization record.
//!
//! # Ownership model
//!
//! A [`WorldInit`] carries only shared handles: the atomic episode
//! counter and progress meter every world of one manager updates, the
//! immutable asset table, and an optional viewer hook. The manager builds
//! one record and replicates it per world; cloning bumps reference
//! counts, never copies data.

use std::sync::Arc;
use warren_assets::RigidBodyTable;
use warren_core::{EpisodeCounter, ProgressMeter, TickId};

/// Visualization hook, invoked after a world's observations for a tick
/// have been written.
///
/// The simulation never inspects the implementation; it only notifies.
/// Implementations must tolerate concurrent calls from worker threads.
pub trait ViewerBridge: Send + Sync {
    /// Called once per world per tick, after that world's exported rows
    /// are fully written.
    fn world_stepped(&self, world_idx: u32, tick: TickId);
}

/// Shared handles handed to every world at construction.
#[derive(Clone)]
pub struct WorldInit {
    /// Manager-wide episode-id source.
    pub episodes: Arc<EpisodeCounter>,
    /// Immutable collision-asset table.
    pub objects: Arc<RigidBodyTable>,
    /// Manager-wide forward-progress accumulator.
    pub progress: Arc<ProgressMeter>,
    /// Optional visualization hook; `None` in training runs.
    pub viewer: Option<Arc<dyn ViewerBridge>>,
}

impl std::fmt::Debug for WorldInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldInit")
            .field("episodes_issued", &self.episodes.issued())
            .field("progress_total", &self.progress.total())
            .field("viewer", &self.viewer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warren_assets::load_collision_assets;

    struct CountingViewer(AtomicUsize);

    impl ViewerBridge for CountingViewer {
        fn world_stepped(&self, _world_idx: u32, _tick: TickId) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn clones_share_counters() {
        let init = WorldInit {
            episodes: Arc::new(EpisodeCounter::new()),
            objects: Arc::new(load_collision_assets().unwrap()),
            progress: Arc::new(ProgressMeter::new()),
            viewer: None,
        };
        let replica = init.clone();
        init.episodes.next();
        assert_eq!(replica.episodes.issued(), 1);
        replica.progress.add(2.0);
        assert_eq!(init.progress.total(), 2.0);
    }

    #[test]
    fn viewer_hook_is_invocable_through_the_handle() {
        let viewer = Arc::new(CountingViewer(AtomicUsize::new(0)));
        let init = WorldInit {
            episodes: Arc::new(EpisodeCounter::new()),
            objects: Arc::new(load_collision_assets().unwrap()),
            progress: Arc::new(ProgressMeter::new()),
            viewer: Some(viewer.clone()),
        };
        if let Some(v) = &init.viewer {
            v.world_stepped(0, TickId(0));
        }
        assert_eq!(viewer.0.load(Ordering::Relaxed), 1);
    }
}
