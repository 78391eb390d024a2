//! The manager: one backend, many worlds, one tick at a time.
//!
//! # Design
//!
//! [`Manager`] is the only type trainers construct. It owns the chosen
//! execution backend behind `Box<dyn Executor>`, the shared episode
//! counter and progress meter, and nothing else; all simulation state
//! and all exported buffers live in the backend. Construction finishes
//! with a reset of every world plus one tick, so every exported tensor
//! already holds coherent episode data when `new` returns.
//!
//! # Flag protocol
//!
//! Flags are written now and applied on the owning world's next tick.
//! Reset and checkpoint-load are edge-triggered and auto-cleared by the
//! tick that consumes them; checkpoint-save is level-triggered and
//! stays in force until the caller clears it. A reset wins over a
//! simultaneous load.

use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::train::TrainInterface;
use std::sync::Arc;
use warren_assets::load_collision_assets;
use warren_core::{
    EpisodeCounter, ExecMode, ExportId, ProgressMeter, ACTION_COMPONENTS,
};
use warren_exec::{
    BatchExecutor, Device, Executor, RolloutBuffers, StepMetrics, Stream, Tensor,
    ThreadedExecutor,
};
use warren_sim::checkpoint::CHECKPOINT_BYTES;
use warren_sim::consts::NUM_AGENTS;
use warren_sim::{ExportSchema, ViewerBridge, WorldInit, WorldParams};

/// Orchestrates a batch of lockstepped worlds behind one backend.
pub struct Manager {
    config: ManagerConfig,
    exec: Box<dyn Executor>,
    episodes: Arc<EpisodeCounter>,
    progress: Arc<ProgressMeter>,
}

// `Executor` is a `Send` trait, so the whole manager can move to a
// driver thread.
const _: () = {
    const fn assert_send<T: Send>() {}
    assert_send::<Manager>();
};

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("exec", &self.config.exec)
            .field("num_worlds", &self.config.num_worlds)
            .field("episodes_issued", &self.episodes.issued())
            .finish()
    }
}

impl Manager {
    /// Build the configured backend and bring every world into episode
    /// 0.
    ///
    /// # Errors
    ///
    /// Fails on an invalid config or unloadable collision assets; both
    /// are fatal, nothing is partially constructed.
    pub fn new(config: ManagerConfig) -> Result<Self, ManagerError> {
        Self::with_viewer(config, None)
    }

    /// [`new`](Self::new) with a visualization hook that is invoked
    /// after each world's observations are written.
    pub fn with_viewer(
        config: ManagerConfig,
        viewer: Option<Arc<dyn ViewerBridge>>,
    ) -> Result<Self, ManagerError> {
        config.validate()?;
        let objects = Arc::new(load_collision_assets()?);
        let episodes = Arc::new(EpisodeCounter::new());
        let progress = Arc::new(ProgressMeter::new());
        let init = WorldInit {
            episodes: Arc::clone(&episodes),
            objects,
            progress: Arc::clone(&progress),
            viewer,
        };
        let params = WorldParams {
            auto_reset: config.auto_reset,
            flags: config.sim_flags,
            reward_mode: config.reward_mode,
            button_width: config.button_width,
            door_width: config.door_width,
        };
        let exec: Box<dyn Executor> = match config.exec {
            ExecMode::Threaded { num_workers } => Box::new(ThreadedExecutor::new(
                config.num_worlds,
                num_workers,
                params,
                init,
            )),
            ExecMode::Batched { device_index } => Box::new(BatchExecutor::new(
                config.num_worlds,
                device_index,
                params,
                init,
            )),
        };

        let mut manager = Self {
            config,
            exec,
            episodes,
            progress,
        };
        // First tick: every world resets into its first episode, so the
        // tensors are valid before the caller ever reads them.
        for world_idx in 0..manager.config.num_worlds {
            manager.trigger_reset(world_idx);
        }
        manager.step();
        Ok(manager)
    }

    // ── Stepping and flags ──────────────────────────────────────

    /// Advance every world exactly one tick.
    pub fn step(&mut self) -> StepMetrics {
        self.exec.step()
    }

    /// Request a reset of one world, applied on its next tick and then
    /// cleared.
    ///
    /// # Panics
    ///
    /// Panics if `world_idx` is out of range.
    pub fn trigger_reset(&mut self, world_idx: u32) {
        self.check_world(world_idx);
        self.exec.write_i32(ExportId::Reset, world_idx as usize, &[1]);
    }

    /// Write one agent's 4-bucket action record. The record persists
    /// and keeps applying every tick until overwritten.
    ///
    /// # Panics
    ///
    /// Panics if `world_idx` or `agent_idx` is out of range.
    pub fn set_action(
        &mut self,
        world_idx: u32,
        agent_idx: usize,
        move_amount: i32,
        move_angle: i32,
        rotate: i32,
        interact: i32,
    ) {
        self.check_world(world_idx);
        assert!(
            agent_idx < NUM_AGENTS,
            "agent index {agent_idx} out of range for {NUM_AGENTS} agents"
        );
        let offset = (world_idx as usize * NUM_AGENTS + agent_idx) * ACTION_COMPONENTS;
        self.exec.write_i32(
            ExportId::Action,
            offset,
            &[move_amount, move_angle, rotate, interact],
        );
    }

    /// Set or clear one world's level-triggered save flag. While set,
    /// the world serializes its full state into its checkpoint row at
    /// the end of every tick.
    ///
    /// # Panics
    ///
    /// Panics if `world_idx` is out of range.
    pub fn set_save_checkpoint(&mut self, world_idx: u32, value: bool) {
        self.check_world(world_idx);
        self.exec
            .write_i32(ExportId::CheckpointSave, world_idx as usize, &[i32::from(value)]);
    }

    /// Request a restore of one world from its checkpoint row, applied
    /// on its next tick instead of advancing and then cleared. An
    /// invalid blob skips the restore and is counted in the metrics.
    ///
    /// # Panics
    ///
    /// Panics if `world_idx` is out of range.
    pub fn trigger_load_checkpoint(&mut self, world_idx: u32) {
        self.check_world(world_idx);
        self.exec
            .write_i32(ExportId::CheckpointLoad, world_idx as usize, &[1]);
    }

    /// Overwrite one world's checkpoint row with a full blob. The
    /// trainer-side path for moving snapshots between worlds.
    ///
    /// # Panics
    ///
    /// Panics if `world_idx` is out of range or `bytes` is not exactly
    /// one blob long.
    pub fn write_checkpoint(&mut self, world_idx: u32, bytes: &[u8]) {
        self.check_world(world_idx);
        assert_eq!(
            bytes.len(),
            CHECKPOINT_BYTES,
            "checkpoint blob is {} bytes, expected {CHECKPOINT_BYTES}",
            bytes.len()
        );
        self.exec
            .write_u8(ExportId::Checkpoint, world_idx as usize * CHECKPOINT_BYTES, bytes);
    }

    // ── Tensor accessors ────────────────────────────────────────

    /// Per-world reset flags.
    pub fn reset_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::Reset)
    }

    /// Per-agent action records.
    pub fn action_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::Action)
    }

    /// Per-agent rewards for the last tick.
    pub fn reward_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::Reward)
    }

    /// Per-agent done flags.
    pub fn done_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::Done)
    }

    /// Per-agent self observations.
    pub fn self_observation_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::SelfObservation)
    }

    /// Per-agent partner observations.
    pub fn partner_observations_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::PartnerObservations)
    }

    /// Per-agent room-entity observations.
    pub fn room_entity_observations_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::RoomEntityObservations)
    }

    /// Per-agent door observations.
    pub fn door_observation_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::DoorObservation)
    }

    /// Per-agent lidar sweeps.
    pub fn lidar_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::Lidar)
    }

    /// Per-agent steps remaining in the episode.
    pub fn steps_remaining_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::StepsRemaining)
    }

    /// Per-agent agent indices.
    pub fn agent_id_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::AgentId)
    }

    /// Per-world checkpoint blobs.
    pub fn checkpoint_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::Checkpoint)
    }

    /// Per-world checkpoint-load flags.
    pub fn checkpoint_reset_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::CheckpointLoad)
    }

    /// Per-world checkpoint-save flags.
    pub fn checkpoint_save_tensor(&self) -> Tensor<'_> {
        self.exec.tensor(ExportId::CheckpointSave)
    }

    // ── Train-facing surfaces ───────────────────────────────────

    /// The named tensor bundle trainers consume.
    pub fn train_interface(&self) -> TrainInterface<'_> {
        TrainInterface::new(self.exec.as_ref())
    }

    /// Enqueue one accelerated rollout step on `stream`. Batched
    /// backend only; nothing is enqueued on a validation failure.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Exec`] when the backend has no
    /// device-resident exports or when `buffers` fails validation.
    pub fn rollout_step(
        &mut self,
        stream: &Stream,
        buffers: &RolloutBuffers,
    ) -> Result<(), ManagerError> {
        self.exec.rollout(buffers, stream)?;
        Ok(())
    }

    /// The device the exports live on; `None` for the threaded
    /// backend.
    pub fn device(&self) -> Option<&Arc<Device>> {
        self.exec.device()
    }

    // ── Introspection ───────────────────────────────────────────

    /// Metrics from the most recent synchronized tick.
    pub fn last_metrics(&self) -> &StepMetrics {
        self.exec.last_metrics()
    }

    /// The configuration this manager was built from.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The export schema shared by every tensor accessor.
    pub fn schema(&self) -> &ExportSchema {
        self.exec.schema()
    }

    /// Number of worlds advanced per tick.
    pub fn num_worlds(&self) -> u32 {
        self.config.num_worlds
    }

    /// Episode ids handed out so far across all worlds.
    pub fn episodes_issued(&self) -> u32 {
        self.episodes.issued()
    }

    /// Aggregate forward progress across all worlds since construction.
    pub fn progress_total(&self) -> f32 {
        self.progress.total()
    }

    fn check_world(&self, world_idx: u32) {
        assert!(
            world_idx < self.config.num_worlds,
            "world index {world_idx} out of range for {} worlds",
            self.config.num_worlds
        );
    }
}
