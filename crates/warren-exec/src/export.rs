//! Export storage and the [`Tensor`] view type.
//!
//! # Ownership model
//!
//! The backend exclusively owns every exported buffer. [`ExportTable`] is
//! the host-resident form used by the threaded backend: one typed flat
//! vector per slot, allocated once from the schema and never reallocated,
//! so buffer identity is stable for the backend's lifetime. Before a tick
//! the table is carved into disjoint per-world [`WorldLanes`]; between
//! ticks the manager and trainer only reach the storage through
//! [`Tensor`] views.
//!
//! A [`Tensor`] is a view descriptor, not a copy: slot, dtype, shape, and
//! where the bytes live. For host-resident exports the typed accessors
//! borrow; for device-resident exports they copy out, which is the
//! explicit host/device boundary the batched backend requires.

use crate::device::{Device, DeviceBuffer};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use warren_core::{Dtype, ExportId, Shape};
use warren_sim::{ExportSchema, WorldLanes};

/// Where a tensor's backing memory lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Affinity {
    /// Plain host memory; typed accessors borrow it.
    Host,
    /// Resident on the device with this index; typed accessors copy out.
    Device(u32),
}

enum TensorData<'a> {
    F32(&'a [f32]),
    I32(&'a [i32]),
    U8(&'a [u8]),
    Device {
        device: Arc<Device>,
        buffer: DeviceBuffer,
    },
}

/// A fixed-shape view over one exported buffer.
///
/// Cheap to construct and idempotent: accessors hand out a fresh
/// descriptor over the same backing storage on every call; they never
/// allocate new storage.
pub struct Tensor<'a> {
    id: ExportId,
    dtype: Dtype,
    shape: Shape,
    affinity: Affinity,
    data: TensorData<'a>,
}

impl fmt::Debug for Tensor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.id)
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("affinity", &self.affinity)
            .finish()
    }
}

impl<'a> Tensor<'a> {
    pub(crate) fn host_f32(id: ExportId, shape: Shape, data: &'a [f32]) -> Self {
        Self {
            id,
            dtype: Dtype::F32,
            shape,
            affinity: Affinity::Host,
            data: TensorData::F32(data),
        }
    }

    pub(crate) fn host_i32(id: ExportId, shape: Shape, data: &'a [i32]) -> Self {
        Self {
            id,
            dtype: Dtype::I32,
            shape,
            affinity: Affinity::Host,
            data: TensorData::I32(data),
        }
    }

    pub(crate) fn host_u8(id: ExportId, shape: Shape, data: &'a [u8]) -> Self {
        Self {
            id,
            dtype: Dtype::U8,
            shape,
            affinity: Affinity::Host,
            data: TensorData::U8(data),
        }
    }

    pub(crate) fn device(
        id: ExportId,
        dtype: Dtype,
        shape: Shape,
        device: Arc<Device>,
        buffer: DeviceBuffer,
    ) -> Self {
        Self {
            id,
            dtype,
            shape,
            affinity: Affinity::Device(device.index()),
            data: TensorData::Device { device, buffer },
        }
    }

    /// The export slot this view covers.
    pub fn id(&self) -> ExportId {
        self.id
    }

    /// Element type.
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Row-major shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Where the backing memory lives.
    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    /// Total element count.
    pub fn elem_count(&self) -> usize {
        warren_core::elem_count(&self.shape)
    }

    /// The elements, borrowed for host tensors, copied out for device
    /// tensors.
    ///
    /// # Panics
    ///
    /// Panics if the slot's dtype is not f32.
    pub fn f32(&self) -> Cow<'a, [f32]> {
        match &self.data {
            TensorData::F32(s) => Cow::Borrowed(*s),
            TensorData::Device { device, buffer } if self.dtype == Dtype::F32 => {
                Cow::Owned(device.read_f32(*buffer))
            }
            _ => panic!("tensor {} is {}, not f32", self.id, self.dtype),
        }
    }

    /// The elements, borrowed for host tensors, copied out for device
    /// tensors.
    ///
    /// # Panics
    ///
    /// Panics if the slot's dtype is not i32.
    pub fn i32(&self) -> Cow<'a, [i32]> {
        match &self.data {
            TensorData::I32(s) => Cow::Borrowed(*s),
            TensorData::Device { device, buffer } if self.dtype == Dtype::I32 => {
                Cow::Owned(device.read_i32(*buffer))
            }
            _ => panic!("tensor {} is {}, not i32", self.id, self.dtype),
        }
    }

    /// The elements, borrowed for host tensors, copied out for device
    /// tensors.
    ///
    /// # Panics
    ///
    /// Panics if the slot's dtype is not u8.
    pub fn u8(&self) -> Cow<'a, [u8]> {
        match &self.data {
            TensorData::U8(s) => Cow::Borrowed(*s),
            TensorData::Device { device, buffer } if self.dtype == Dtype::U8 => {
                Cow::Owned(device.read_u8(*buffer))
            }
            _ => panic!("tensor {} is {}, not u8", self.id, self.dtype),
        }
    }
}

/// Host-resident backing storage for every export slot.
#[derive(Debug)]
pub struct ExportTable {
    schema: ExportSchema,
    reset: Vec<i32>,
    action: Vec<i32>,
    reward: Vec<f32>,
    done: Vec<i32>,
    self_obs: Vec<f32>,
    agent_id: Vec<i32>,
    partner_obs: Vec<f32>,
    room_entity_obs: Vec<f32>,
    door_obs: Vec<f32>,
    lidar: Vec<f32>,
    steps_remaining: Vec<i32>,
    checkpoint: Vec<u8>,
    checkpoint_load: Vec<i32>,
    checkpoint_save: Vec<i32>,
}

impl ExportTable {
    /// Allocate zeroed storage for every slot of `schema`.
    pub fn new(schema: ExportSchema) -> Self {
        let n = |id: ExportId| schema.elems(id);
        Self {
            schema,
            reset: vec![0; n(ExportId::Reset)],
            action: vec![0; n(ExportId::Action)],
            reward: vec![0.0; n(ExportId::Reward)],
            done: vec![0; n(ExportId::Done)],
            self_obs: vec![0.0; n(ExportId::SelfObservation)],
            agent_id: vec![0; n(ExportId::AgentId)],
            partner_obs: vec![0.0; n(ExportId::PartnerObservations)],
            room_entity_obs: vec![0.0; n(ExportId::RoomEntityObservations)],
            door_obs: vec![0.0; n(ExportId::DoorObservation)],
            lidar: vec![0.0; n(ExportId::Lidar)],
            steps_remaining: vec![0; n(ExportId::StepsRemaining)],
            checkpoint: vec![0; n(ExportId::Checkpoint)],
            checkpoint_load: vec![0; n(ExportId::CheckpointLoad)],
            checkpoint_save: vec![0; n(ExportId::CheckpointSave)],
        }
    }

    /// The schema this table was allocated from.
    pub fn schema(&self) -> &ExportSchema {
        &self.schema
    }

    /// Carve the table into disjoint per-world lanes for one tick.
    pub fn carve(&mut self) -> Vec<WorldLanes<'_>> {
        let schema = self.schema;
        carve_worlds(
            &schema,
            &mut self.reset,
            &mut self.action,
            &mut self.reward,
            &mut self.done,
            &mut self.self_obs,
            &mut self.agent_id,
            &mut self.partner_obs,
            &mut self.room_entity_obs,
            &mut self.door_obs,
            &mut self.lidar,
            &mut self.steps_remaining,
            &mut self.checkpoint,
            &mut self.checkpoint_load,
            &mut self.checkpoint_save,
        )
    }

    /// A view over one slot.
    pub fn tensor(&self, id: ExportId) -> Tensor<'_> {
        let shape = self.schema.shape(id);
        match id {
            ExportId::Reset => Tensor::host_i32(id, shape, &self.reset),
            ExportId::Action => Tensor::host_i32(id, shape, &self.action),
            ExportId::Reward => Tensor::host_f32(id, shape, &self.reward),
            ExportId::Done => Tensor::host_i32(id, shape, &self.done),
            ExportId::SelfObservation => Tensor::host_f32(id, shape, &self.self_obs),
            ExportId::AgentId => Tensor::host_i32(id, shape, &self.agent_id),
            ExportId::PartnerObservations => Tensor::host_f32(id, shape, &self.partner_obs),
            ExportId::RoomEntityObservations => {
                Tensor::host_f32(id, shape, &self.room_entity_obs)
            }
            ExportId::DoorObservation => Tensor::host_f32(id, shape, &self.door_obs),
            ExportId::Lidar => Tensor::host_f32(id, shape, &self.lidar),
            ExportId::StepsRemaining => Tensor::host_i32(id, shape, &self.steps_remaining),
            ExportId::Checkpoint => Tensor::host_u8(id, shape, &self.checkpoint),
            ExportId::CheckpointLoad => Tensor::host_i32(id, shape, &self.checkpoint_load),
            ExportId::CheckpointSave => Tensor::host_i32(id, shape, &self.checkpoint_save),
        }
    }

    /// Write `values` into an i32 slot at `offset` elements.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not i32 or the write overruns the buffer.
    pub fn write_i32(&mut self, id: ExportId, offset: usize, values: &[i32]) {
        let lane = match id {
            ExportId::Reset => &mut self.reset,
            ExportId::Action => &mut self.action,
            ExportId::Done => &mut self.done,
            ExportId::AgentId => &mut self.agent_id,
            ExportId::StepsRemaining => &mut self.steps_remaining,
            ExportId::CheckpointLoad => &mut self.checkpoint_load,
            ExportId::CheckpointSave => &mut self.checkpoint_save,
            _ => panic!("export slot {id} is not i32"),
        };
        lane[offset..offset + values.len()].copy_from_slice(values);
    }

    /// Write `values` into a u8 slot at `offset` elements.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not u8 or the write overruns the buffer.
    pub fn write_u8(&mut self, id: ExportId, offset: usize, values: &[u8]) {
        match id {
            ExportId::Checkpoint => {
                self.checkpoint[offset..offset + values.len()].copy_from_slice(values);
            }
            _ => panic!("export slot {id} is not u8"),
        }
    }
}

/// Split full-table slices into per-world lanes, one [`WorldLanes`] per
/// world, in world order. Shared by the host table and the batched
/// backend's device lane guards.
#[allow(clippy::too_many_arguments)]
pub(crate) fn carve_worlds<'a>(
    schema: &ExportSchema,
    reset: &'a mut [i32],
    action: &'a mut [i32],
    reward: &'a mut [f32],
    done: &'a mut [i32],
    self_obs: &'a mut [f32],
    agent_id: &'a mut [i32],
    partner_obs: &'a mut [f32],
    room_entity_obs: &'a mut [f32],
    door_obs: &'a mut [f32],
    lidar: &'a mut [f32],
    steps_remaining: &'a mut [i32],
    checkpoint: &'a mut [u8],
    checkpoint_load: &'a mut [i32],
    checkpoint_save: &'a mut [i32],
) -> Vec<WorldLanes<'a>> {
    let n = schema.num_worlds() as usize;
    let row = |id: ExportId| schema.row_elems(id).max(1);
    let mut reset = reset.chunks_mut(row(ExportId::Reset));
    let mut action = action.chunks_mut(row(ExportId::Action));
    let mut reward = reward.chunks_mut(row(ExportId::Reward));
    let mut done = done.chunks_mut(row(ExportId::Done));
    let mut self_obs = self_obs.chunks_mut(row(ExportId::SelfObservation));
    let mut agent_id = agent_id.chunks_mut(row(ExportId::AgentId));
    let mut partner_obs = partner_obs.chunks_mut(row(ExportId::PartnerObservations));
    let mut room_entity_obs = room_entity_obs.chunks_mut(row(ExportId::RoomEntityObservations));
    let mut door_obs = door_obs.chunks_mut(row(ExportId::DoorObservation));
    let mut lidar = lidar.chunks_mut(row(ExportId::Lidar));
    let mut steps_remaining = steps_remaining.chunks_mut(row(ExportId::StepsRemaining));
    let mut checkpoint = checkpoint.chunks_mut(row(ExportId::Checkpoint));
    let mut checkpoint_load = checkpoint_load.chunks_mut(row(ExportId::CheckpointLoad));
    let mut checkpoint_save = checkpoint_save.chunks_mut(row(ExportId::CheckpointSave));

    fn next<'a, T>(name: &str, chunk: Option<&'a mut [T]>) -> &'a mut [T] {
        match chunk {
            Some(c) => c,
            None => panic!("export lane {name} shorter than the schema"),
        }
    }

    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let lanes = WorldLanes {
            reset: next("reset", reset.next()),
            action: next("action", action.next()),
            reward: next("reward", reward.next()),
            done: next("done", done.next()),
            self_obs: next("self_obs", self_obs.next()),
            agent_id: next("agent_id", agent_id.next()),
            partner_obs: next("partner_obs", partner_obs.next()),
            room_entity_obs: next("room_entity_obs", room_entity_obs.next()),
            door_obs: next("door_obs", door_obs.next()),
            lidar: next("lidar", lidar.next()),
            steps_remaining: next("steps_remaining", steps_remaining.next()),
            checkpoint: next("checkpoint", checkpoint.next()),
            checkpoint_load: next("checkpoint_load", checkpoint_load.next()),
            checkpoint_save: next("checkpoint_save", checkpoint_save.next()),
        };
        lanes.check();
        out.push(lanes);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use warren_sim::consts::NUM_AGENTS;

    #[test]
    fn carve_yields_one_checked_lane_set_per_world() {
        let mut table = ExportTable::new(ExportSchema::new(3));
        let lanes = table.carve();
        assert_eq!(lanes.len(), 3);
        // check() already ran for every world inside carve.
    }

    #[test]
    fn carved_lanes_alias_the_exported_rows() {
        let mut table = ExportTable::new(ExportSchema::new(2));
        {
            let mut lanes = table.carve();
            lanes[1].reward[0] = 3.5;
            lanes[1].done[NUM_AGENTS - 1] = 1;
        }
        let reward = table.tensor(ExportId::Reward);
        assert_eq!(reward.f32()[NUM_AGENTS], 3.5);
        let done = table.tensor(ExportId::Done);
        assert_eq!(done.i32()[2 * NUM_AGENTS - 1], 1);
    }

    #[test]
    fn tensors_are_idempotent_descriptors() {
        let table = ExportTable::new(ExportSchema::new(4));
        let a = table.tensor(ExportId::Lidar);
        let b = table.tensor(ExportId::Lidar);
        assert_eq!(a.shape(), b.shape());
        assert_eq!(a.dtype(), b.dtype());
        assert_eq!(a.affinity(), Affinity::Host);
        assert_eq!(a.elem_count(), b.f32().len());
    }

    #[test]
    fn host_writes_land_in_the_right_rows() {
        let mut table = ExportTable::new(ExportSchema::new(4));
        table.write_i32(ExportId::Reset, 2, &[1]);
        assert_eq!(table.tensor(ExportId::Reset).i32().as_ref(), &[0, 0, 1, 0]);

        let blob_row = table.schema().row_elems(ExportId::Checkpoint);
        table.write_u8(ExportId::Checkpoint, blob_row, &[9, 9]);
        assert_eq!(table.tensor(ExportId::Checkpoint).u8()[blob_row], 9);
    }

    #[test]
    #[should_panic(expected = "not i32")]
    fn i32_write_to_f32_slot_is_rejected() {
        let mut table = ExportTable::new(ExportSchema::new(1));
        table.write_i32(ExportId::Reward, 0, &[1]);
    }

    #[test]
    #[should_panic(expected = "not f32")]
    fn dtype_mismatched_view_access_is_rejected() {
        let table = ExportTable::new(ExportSchema::new(1));
        let _ = table.tensor(ExportId::Done).f32();
    }
}
