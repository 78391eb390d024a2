//! The CPU thread-pool backend.
//!
//! Worlds are partitioned into contiguous chunks, one scoped worker per
//! chunk; the tick barrier is the scope join, so `step` returns only
//! after every world has published its rows. Lanes are carved from the
//! host [`ExportTable`] before spawning, which makes the per-world
//! writes disjoint by construction.

use crate::executor::Executor;
use crate::export::{ExportTable, Tensor};
use crate::metrics::StepMetrics;
use std::time::Instant;
use warren_core::ExportId;
use warren_sim::{ExportSchema, World, WorldInit, WorldLanes, WorldParams};

const MAX_WORKERS: usize = 64;
const DEFAULT_WORKER_CAP: usize = 16;

/// Lockstep executor running worlds on a pool of scoped threads.
pub struct ThreadedExecutor {
    table: ExportTable,
    worlds: Vec<World>,
    num_workers: usize,
    metrics: StepMetrics,
}

// The manager owns exactly one executor and may move it across threads.
const _: () = {
    const fn assert_send<T: Send>() {}
    assert_send::<ThreadedExecutor>();
};

impl std::fmt::Debug for ThreadedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadedExecutor")
            .field("num_worlds", &self.worlds.len())
            .field("num_workers", &self.num_workers)
            .finish()
    }
}

impl ThreadedExecutor {
    /// Build `num_worlds` worlds in their pre-episode state, plus the
    /// host export storage for all of them.
    ///
    /// `workers` caps the pool size; `None` picks a default from the
    /// machine's parallelism. The pool never exceeds the world count.
    pub fn new(
        num_worlds: u32,
        workers: Option<usize>,
        params: WorldParams,
        init: WorldInit,
    ) -> Self {
        let schema = ExportSchema::new(num_worlds);
        let worlds = (0..num_worlds)
            .map(|idx| World::new(idx, params, init.clone()))
            .collect::<Vec<_>>();
        let num_workers = resolve_workers(workers, num_worlds as usize);
        Self {
            table: ExportTable::new(schema),
            worlds,
            num_workers,
            metrics: StepMetrics::default(),
        }
    }

    /// Worker threads used per tick.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }
}

fn resolve_workers(requested: Option<usize>, num_worlds: usize) -> usize {
    let base = match requested {
        Some(n) => n.clamp(1, MAX_WORKERS),
        None => std::thread::available_parallelism()
            .map(|p| p.get() / 2)
            .unwrap_or(1)
            .clamp(1, DEFAULT_WORKER_CAP),
    };
    base.min(num_worlds).max(1)
}

fn tick_chunk(worlds: &mut [World], lanes: &mut [WorldLanes<'_>]) -> StepMetrics {
    let mut partial = StepMetrics::default();
    for (world, lane) in worlds.iter_mut().zip(lanes.iter_mut()) {
        partial.absorb(world.tick(lane));
    }
    partial
}

impl Executor for ThreadedExecutor {
    fn schema(&self) -> &ExportSchema {
        self.table.schema()
    }

    fn step(&mut self) -> StepMetrics {
        let start = Instant::now();
        let mut lanes = self.table.carve();
        let chunk = self.worlds.len().div_ceil(self.num_workers).max(1);

        let mut metrics = StepMetrics::default();
        if self.num_workers == 1 {
            metrics.merge(&tick_chunk(&mut self.worlds, &mut lanes));
        } else {
            let world_chunks = self.worlds.chunks_mut(chunk);
            let lane_chunks = lanes.chunks_mut(chunk);
            std::thread::scope(|scope| {
                let handles = world_chunks
                    .zip(lane_chunks)
                    .map(|(worlds, lanes)| scope.spawn(move || tick_chunk(worlds, lanes)))
                    .collect::<Vec<_>>();
                for handle in handles {
                    match handle.join() {
                        Ok(partial) => metrics.merge(&partial),
                        Err(panic) => std::panic::resume_unwind(panic),
                    }
                }
            });
        }
        drop(lanes);

        metrics.total_us = start.elapsed().as_micros() as u64;
        self.metrics = metrics.clone();
        metrics
    }

    fn tensor(&self, id: ExportId) -> Tensor<'_> {
        self.table.tensor(id)
    }

    fn write_i32(&mut self, id: ExportId, offset: usize, values: &[i32]) {
        self.table.write_i32(id, offset, values);
    }

    fn write_u8(&mut self, id: ExportId, offset: usize, values: &[u8]) {
        self.table.write_u8(id, offset, values);
    }

    fn last_metrics(&self) -> &StepMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecError;
    use crate::stream::Stream;
    use std::sync::Arc;
    use warren_assets::load_collision_assets;
    use warren_core::{EpisodeCounter, ProgressMeter};
    use warren_sim::consts::NUM_AGENTS;

    fn init() -> WorldInit {
        WorldInit {
            episodes: Arc::new(EpisodeCounter::new()),
            objects: Arc::new(load_collision_assets().unwrap()),
            progress: Arc::new(ProgressMeter::new()),
            viewer: None,
        }
    }

    fn reset_all(exec: &mut ThreadedExecutor) {
        let n = exec.schema().num_worlds() as usize;
        exec.write_i32(ExportId::Reset, 0, &vec![1; n]);
    }

    // ── Worker resolution ───────────────────────────────────────

    #[test]
    fn worker_count_never_exceeds_world_count() {
        assert_eq!(resolve_workers(Some(8), 3), 3);
        assert_eq!(resolve_workers(Some(0), 3), 1);
        assert_eq!(resolve_workers(Some(500), 1000), MAX_WORKERS);
        assert!(resolve_workers(None, 1000) >= 1);
    }

    // ── Stepping ────────────────────────────────────────────────

    #[test]
    fn step_advances_every_world_in_lockstep() {
        let mut exec = ThreadedExecutor::new(8, Some(3), WorldParams::default(), init());
        reset_all(&mut exec);
        let m = exec.step();
        assert_eq!(m.worlds_reset, 8);
        let m = exec.step();
        assert_eq!(m.worlds_advanced, 8);
        assert_eq!(m.worlds_reset, 0);
        assert_eq!(exec.last_metrics(), &m);
    }

    #[test]
    fn single_worker_and_many_workers_agree() {
        let counter = Arc::new(EpisodeCounter::new());
        let shared = WorldInit {
            episodes: Arc::clone(&counter),
            ..init()
        };
        let mut one = ThreadedExecutor::new(4, Some(1), WorldParams::default(), shared.clone());
        let mut many = ThreadedExecutor::new(4, Some(4), WorldParams::default(), shared);
        reset_all(&mut one);
        reset_all(&mut many);
        for _ in 0..5 {
            one.step();
            many.step();
        }
        for id in [ExportId::Reward, ExportId::SelfObservation, ExportId::Lidar] {
            assert_eq!(
                one.tensor(id).f32().as_ref(),
                many.tensor(id).f32().as_ref(),
                "slot {id}"
            );
        }
        assert_eq!(
            one.tensor(ExportId::StepsRemaining).i32().as_ref(),
            many.tensor(ExportId::StepsRemaining).i32().as_ref()
        );
    }

    #[test]
    fn tensors_expose_post_tick_rows() {
        let mut exec = ThreadedExecutor::new(2, Some(2), WorldParams::default(), init());
        reset_all(&mut exec);
        exec.step();
        let steps = exec.tensor(ExportId::StepsRemaining);
        assert!(steps.i32().iter().all(|&s| s > 0));
        let agent_id = exec.tensor(ExportId::AgentId);
        let expected: Vec<i32> = (0..2).flat_map(|_| 0..NUM_AGENTS as i32).collect();
        assert_eq!(agent_id.i32().as_ref(), expected);
    }

    // ── Rollout ─────────────────────────────────────────────────

    #[test]
    fn rollout_is_unsupported_on_the_host_backend() {
        let mut exec = ThreadedExecutor::new(1, Some(1), WorldParams::default(), init());
        assert!(exec.device().is_none());
        let dev = crate::Device::new(0);
        let buffers = crate::RolloutBuffers {
            actions: dev.alloc_i32(exec.schema().elems(ExportId::Action)),
            resets: dev.alloc_i32(1),
            rewards: dev.alloc_f32(NUM_AGENTS),
            dones: dev.alloc_i32(NUM_AGENTS),
            policy_assignments: None,
            observations: Vec::new(),
            stats: Vec::new(),
            schema_version: warren_sim::SCHEMA_VERSION,
        };
        let stream = Stream::new();
        assert_eq!(
            exec.rollout(&buffers, &stream),
            Err(ExecError::RolloutUnsupported)
        );
    }
}
