//! The batched device backend.
//!
//! Exports live in device allocations; every tick runs as an op on a
//! [`Stream`], and the tick barrier is a stream fence. `step` drives an
//! internal stream and fences before returning, so its callers see the
//! same synchronous contract as the threaded backend. The accelerated
//! rollout path instead enqueues the whole transfer on the caller's
//! stream and returns without fencing; ordering is the caller's to
//! observe via [`Stream::synchronize`].

use crate::device::{lock, Device, DeviceBuffer};
use crate::executor::{ExecError, Executor, RolloutBuffers};
use crate::export::{carve_worlds, Tensor};
use crate::metrics::StepMetrics;
use crate::stream::Stream;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use warren_core::{Dtype, ExportId};
use warren_sim::{ExportSchema, World, WorldInit, WorldParams, SCHEMA_VERSION};

/// Shared handles to every export allocation's storage, cloned into
/// tick ops so they can run after the enqueueing call returns.
#[derive(Clone)]
struct LaneCells {
    reset: Arc<Mutex<Vec<i32>>>,
    action: Arc<Mutex<Vec<i32>>>,
    reward: Arc<Mutex<Vec<f32>>>,
    done: Arc<Mutex<Vec<i32>>>,
    self_obs: Arc<Mutex<Vec<f32>>>,
    agent_id: Arc<Mutex<Vec<i32>>>,
    partner_obs: Arc<Mutex<Vec<f32>>>,
    room_entity_obs: Arc<Mutex<Vec<f32>>>,
    door_obs: Arc<Mutex<Vec<f32>>>,
    lidar: Arc<Mutex<Vec<f32>>>,
    steps_remaining: Arc<Mutex<Vec<i32>>>,
    checkpoint: Arc<Mutex<Vec<u8>>>,
    checkpoint_load: Arc<Mutex<Vec<i32>>>,
    checkpoint_save: Arc<Mutex<Vec<i32>>>,
}

/// Lockstep executor with device-resident exports and stream-ordered
/// ticks.
pub struct BatchExecutor {
    schema: ExportSchema,
    device: Arc<Device>,
    stream: Stream,
    worlds: Arc<Mutex<Vec<World>>>,
    slots: Vec<DeviceBuffer>,
    lanes: LaneCells,
    shared_metrics: Arc<Mutex<StepMetrics>>,
    last: StepMetrics,
}

const _: () = {
    const fn assert_send<T: Send>() {}
    assert_send::<BatchExecutor>();
};

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("num_worlds", &self.schema.num_worlds())
            .field("device", &self.device.index())
            .finish()
    }
}

impl BatchExecutor {
    /// Build `num_worlds` worlds and allocate every export slot on a
    /// fresh device with index `device_index`.
    pub fn new(
        num_worlds: u32,
        device_index: u32,
        params: WorldParams,
        init: WorldInit,
    ) -> Self {
        let schema = ExportSchema::new(num_worlds);
        let device = Arc::new(Device::new(device_index));
        let slots = ExportId::ALL
            .iter()
            .map(|&id| match schema.dtype(id) {
                Dtype::F32 => device.alloc_f32(schema.elems(id)),
                Dtype::I32 => device.alloc_i32(schema.elems(id)),
                Dtype::U8 => device.alloc_u8(schema.elems(id)),
            })
            .collect::<Vec<_>>();
        let slot = |id: ExportId| slots[id.index()];
        let lanes = LaneCells {
            reset: device.cell_i32(slot(ExportId::Reset)),
            action: device.cell_i32(slot(ExportId::Action)),
            reward: device.cell_f32(slot(ExportId::Reward)),
            done: device.cell_i32(slot(ExportId::Done)),
            self_obs: device.cell_f32(slot(ExportId::SelfObservation)),
            agent_id: device.cell_i32(slot(ExportId::AgentId)),
            partner_obs: device.cell_f32(slot(ExportId::PartnerObservations)),
            room_entity_obs: device.cell_f32(slot(ExportId::RoomEntityObservations)),
            door_obs: device.cell_f32(slot(ExportId::DoorObservation)),
            lidar: device.cell_f32(slot(ExportId::Lidar)),
            steps_remaining: device.cell_i32(slot(ExportId::StepsRemaining)),
            checkpoint: device.cell_u8(slot(ExportId::Checkpoint)),
            checkpoint_load: device.cell_i32(slot(ExportId::CheckpointLoad)),
            checkpoint_save: device.cell_i32(slot(ExportId::CheckpointSave)),
        };
        let worlds = (0..num_worlds)
            .map(|idx| World::new(idx, params, init.clone()))
            .collect::<Vec<_>>();
        Self {
            schema,
            device,
            stream: Stream::new(),
            worlds: Arc::new(Mutex::new(worlds)),
            slots,
            lanes,
            shared_metrics: Arc::new(Mutex::new(StepMetrics::default())),
            last: StepMetrics::default(),
        }
    }

    fn slot(&self, id: ExportId) -> DeviceBuffer {
        self.slots[id.index()]
    }

    /// The tick as a stream op: lock the worlds and every lane, carve
    /// per-world windows, advance each world, record the metrics.
    fn tick_op(&self) -> impl FnOnce() + Send + 'static {
        let schema = self.schema;
        let worlds = Arc::clone(&self.worlds);
        let cells = self.lanes.clone();
        let shared_metrics = Arc::clone(&self.shared_metrics);
        move || {
            let start = Instant::now();
            let mut worlds = lock(&worlds);
            let mut reset = lock(&cells.reset);
            let mut action = lock(&cells.action);
            let mut reward = lock(&cells.reward);
            let mut done = lock(&cells.done);
            let mut self_obs = lock(&cells.self_obs);
            let mut agent_id = lock(&cells.agent_id);
            let mut partner_obs = lock(&cells.partner_obs);
            let mut room_entity_obs = lock(&cells.room_entity_obs);
            let mut door_obs = lock(&cells.door_obs);
            let mut lidar = lock(&cells.lidar);
            let mut steps_remaining = lock(&cells.steps_remaining);
            let mut checkpoint = lock(&cells.checkpoint);
            let mut checkpoint_load = lock(&cells.checkpoint_load);
            let mut checkpoint_save = lock(&cells.checkpoint_save);

            let mut lanes = carve_worlds(
                &schema,
                &mut reset,
                &mut action,
                &mut reward,
                &mut done,
                &mut self_obs,
                &mut agent_id,
                &mut partner_obs,
                &mut room_entity_obs,
                &mut door_obs,
                &mut lidar,
                &mut steps_remaining,
                &mut checkpoint,
                &mut checkpoint_load,
                &mut checkpoint_save,
            );

            let mut metrics = StepMetrics::default();
            for (world, lane) in worlds.iter_mut().zip(lanes.iter_mut()) {
                metrics.absorb(world.tick(lane));
            }
            metrics.total_us = start.elapsed().as_micros() as u64;
            *lock(&shared_metrics) = metrics;
        }
    }

    fn check_buffer(
        &self,
        what: &'static str,
        buf: DeviceBuffer,
        id: ExportId,
    ) -> Result<(), ExecError> {
        if buf.device_index() != self.device.index() {
            return Err(ExecError::DeviceMismatch {
                what,
                expected: self.device.index(),
                got: buf.device_index(),
            });
        }
        if buf.dtype() != self.schema.dtype(id) {
            return Err(ExecError::BufferDtype { what });
        }
        let expected = self.schema.elems(id);
        if buf.len() != expected {
            return Err(ExecError::BufferLen {
                what,
                expected,
                got: buf.len(),
            });
        }
        Ok(())
    }
}

impl Executor for BatchExecutor {
    fn schema(&self) -> &ExportSchema {
        &self.schema
    }

    fn step(&mut self) -> StepMetrics {
        self.stream.enqueue(self.tick_op());
        self.stream.synchronize();
        self.last = lock(&self.shared_metrics).clone();
        self.last.clone()
    }

    fn tensor(&self, id: ExportId) -> Tensor<'_> {
        Tensor::device(
            id,
            self.schema.dtype(id),
            self.schema.shape(id),
            Arc::clone(&self.device),
            self.slot(id),
        )
    }

    /// Host writes are synchronous: the internal stream is fenced first
    /// so the write cannot land in the middle of a pending tick.
    fn write_i32(&mut self, id: ExportId, offset: usize, values: &[i32]) {
        self.stream.synchronize();
        self.device.write_i32(self.slot(id), offset, values);
    }

    fn write_u8(&mut self, id: ExportId, offset: usize, values: &[u8]) {
        self.stream.synchronize();
        self.device.write_u8(self.slot(id), offset, values);
    }

    fn last_metrics(&self) -> &StepMetrics {
        &self.last
    }

    fn device(&self) -> Option<&Arc<Device>> {
        Some(&self.device)
    }

    fn rollout(&mut self, buffers: &RolloutBuffers, stream: &Stream) -> Result<(), ExecError> {
        if buffers.schema_version != SCHEMA_VERSION {
            return Err(ExecError::SchemaVersion {
                expected: SCHEMA_VERSION,
                got: buffers.schema_version,
            });
        }
        if buffers.policy_assignments.is_some() {
            return Err(ExecError::NoPolicyAssignments);
        }
        if buffers.observations.len() != ExportSchema::OBSERVATIONS.len() {
            return Err(ExecError::BufferCount {
                what: "observations",
                expected: ExportSchema::OBSERVATIONS.len(),
                got: buffers.observations.len(),
            });
        }
        if buffers.stats.len() != ExportSchema::STATS.len() {
            return Err(ExecError::BufferCount {
                what: "stats",
                expected: ExportSchema::STATS.len(),
                got: buffers.stats.len(),
            });
        }
        self.check_buffer("actions", buffers.actions, ExportId::Action)?;
        self.check_buffer("resets", buffers.resets, ExportId::Reset)?;
        self.check_buffer("rewards", buffers.rewards, ExportId::Reward)?;
        self.check_buffer("dones", buffers.dones, ExportId::Done)?;
        for (id, &buf) in ExportSchema::OBSERVATIONS.iter().zip(&buffers.observations) {
            self.check_buffer(id.name(), buf, *id)?;
        }

        // Nothing failed; from here every transfer is enqueued and the
        // call cannot partially apply.
        let device = Arc::clone(&self.device);
        let action_slot = self.slot(ExportId::Action);
        let reset_slot = self.slot(ExportId::Reset);
        let actions = buffers.actions;
        let resets = buffers.resets;
        stream.enqueue(move || {
            device.copy(actions, action_slot);
            device.copy(resets, reset_slot);
        });

        stream.enqueue(self.tick_op());

        let device = Arc::clone(&self.device);
        let reward_slot = self.slot(ExportId::Reward);
        let done_slot = self.slot(ExportId::Done);
        let rewards = buffers.rewards;
        let dones = buffers.dones;
        let obs: Vec<(DeviceBuffer, DeviceBuffer)> = ExportSchema::OBSERVATIONS
            .iter()
            .zip(&buffers.observations)
            .map(|(&id, &dst)| (self.slot(id), dst))
            .collect();
        stream.enqueue(move || {
            device.copy(reward_slot, rewards);
            device.copy(done_slot, dones);
            for (src, dst) in obs {
                device.copy(src, dst);
            }
        });
        Ok(())
    }
}
