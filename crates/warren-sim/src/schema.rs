//! The export schema: dtype and shape of every exported tensor.
//!
//! Shapes are a pure function of the world count and the constants in
//! [`consts`](crate::consts); they are fixed at construction and never
//! change. Backends size their buffers from this schema, the manager
//! builds tensor views from it, and the rollout transfer protocol walks
//! observations in the order [`ExportSchema::OBSERVATIONS`] defines.

use crate::checkpoint::CHECKPOINT_BYTES;
use crate::consts::{
    MAX_OBSERVATIONS_PER_AGENT, NUM_AGENTS, NUM_LIDAR_SAMPLES, SELF_OBS_DIM,
};
use smallvec::smallvec;
use warren_core::{elem_count, Dtype, ExportId, Shape, ACTION_COMPONENTS};

/// Version of the export layout. Bumped whenever a shape, dtype, slot
/// order, or the checkpoint blob layout changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Shape and dtype source for one manager's exports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportSchema {
    num_worlds: u32,
}

impl ExportSchema {
    /// Observation slots in the order the train interface names them and
    /// the rollout protocol copies them.
    pub const OBSERVATIONS: [ExportId; 7] = [
        ExportId::SelfObservation,
        ExportId::PartnerObservations,
        ExportId::RoomEntityObservations,
        ExportId::DoorObservation,
        ExportId::Lidar,
        ExportId::StepsRemaining,
        ExportId::AgentId,
    ];

    /// Per-episode stat slots, in rollout copy order. This simulator
    /// exports none; the slot list exists so the rollout protocol has a
    /// defined (empty) stats section.
    pub const STATS: [ExportId; 0] = [];

    /// Schema for `num_worlds` worlds.
    pub fn new(num_worlds: u32) -> Self {
        Self { num_worlds }
    }

    /// The world count this schema was built for.
    pub fn num_worlds(&self) -> u32 {
        self.num_worlds
    }

    /// Element type of a slot.
    pub fn dtype(&self, id: ExportId) -> Dtype {
        match id {
            ExportId::Reward
            | ExportId::SelfObservation
            | ExportId::PartnerObservations
            | ExportId::RoomEntityObservations
            | ExportId::DoorObservation
            | ExportId::Lidar => Dtype::F32,
            ExportId::Checkpoint => Dtype::U8,
            ExportId::Reset
            | ExportId::Action
            | ExportId::Done
            | ExportId::AgentId
            | ExportId::StepsRemaining
            | ExportId::CheckpointLoad
            | ExportId::CheckpointSave => Dtype::I32,
        }
    }

    /// Row-major shape of a slot.
    pub fn shape(&self, id: ExportId) -> Shape {
        let worlds = i64::from(self.num_worlds);
        let agents = worlds * NUM_AGENTS as i64;
        match id {
            ExportId::Reset | ExportId::CheckpointLoad | ExportId::CheckpointSave => {
                smallvec![worlds, 1]
            }
            ExportId::Action => smallvec![agents, ACTION_COMPONENTS as i64],
            ExportId::Reward | ExportId::Done | ExportId::AgentId | ExportId::StepsRemaining => {
                smallvec![agents, 1]
            }
            ExportId::SelfObservation => smallvec![agents, SELF_OBS_DIM as i64],
            ExportId::PartnerObservations => smallvec![agents, NUM_AGENTS as i64 - 1, 3],
            ExportId::RoomEntityObservations => {
                smallvec![agents, MAX_OBSERVATIONS_PER_AGENT as i64, 3]
            }
            ExportId::DoorObservation => smallvec![agents, 1, 3],
            ExportId::Lidar => smallvec![agents, NUM_LIDAR_SAMPLES as i64, 2],
            ExportId::Checkpoint => smallvec![worlds, CHECKPOINT_BYTES as i64],
        }
    }

    /// Total element count of a slot.
    pub fn elems(&self, id: ExportId) -> usize {
        elem_count(&self.shape(id))
    }

    /// Elements of a slot belonging to one world.
    pub fn row_elems(&self, id: ExportId) -> usize {
        self.elems(id) / self.num_worlds.max(1) as usize
    }

    /// Total byte size of a slot.
    pub fn size_bytes(&self, id: ExportId) -> usize {
        self.elems(id) * self.dtype(id).size_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_match_the_export_contract() {
        let schema = ExportSchema::new(4);
        let agents = 4 * NUM_AGENTS as i64;
        assert_eq!(schema.shape(ExportId::Reset).as_slice(), &[4, 1]);
        assert_eq!(schema.shape(ExportId::Action).as_slice(), &[agents, 4]);
        assert_eq!(schema.shape(ExportId::Reward).as_slice(), &[agents, 1]);
        assert_eq!(
            schema.shape(ExportId::SelfObservation).as_slice(),
            &[agents, SELF_OBS_DIM as i64]
        );
        assert_eq!(
            schema.shape(ExportId::PartnerObservations).as_slice(),
            &[agents, 1, 3]
        );
        assert_eq!(
            schema.shape(ExportId::RoomEntityObservations).as_slice(),
            &[agents, 5, 3]
        );
        assert_eq!(schema.shape(ExportId::DoorObservation).as_slice(), &[agents, 1, 3]);
        assert_eq!(
            schema.shape(ExportId::Lidar).as_slice(),
            &[agents, NUM_LIDAR_SAMPLES as i64, 2]
        );
        assert_eq!(
            schema.shape(ExportId::Checkpoint).as_slice(),
            &[4, CHECKPOINT_BYTES as i64]
        );
    }

    #[test]
    fn dtypes_match_the_export_contract() {
        let schema = ExportSchema::new(1);
        assert_eq!(schema.dtype(ExportId::Reward), Dtype::F32);
        assert_eq!(schema.dtype(ExportId::Done), Dtype::I32);
        assert_eq!(schema.dtype(ExportId::Checkpoint), Dtype::U8);
        assert_eq!(schema.dtype(ExportId::CheckpointSave), Dtype::I32);
    }

    #[test]
    fn row_elems_scale_with_worlds() {
        let small = ExportSchema::new(2);
        let large = ExportSchema::new(64);
        for id in ExportId::ALL {
            assert_eq!(small.row_elems(id), large.row_elems(id), "slot {id}");
            assert_eq!(large.elems(id), 64 * large.row_elems(id), "slot {id}");
        }
    }

    #[test]
    fn observation_order_is_the_train_interface_order() {
        let names: Vec<&str> = ExportSchema::OBSERVATIONS.iter().map(|id| id.name()).collect();
        assert_eq!(
            names,
            [
                "self_observation",
                "partner_observations",
                "room_entity_observations",
                "door_observation",
                "lidar",
                "steps_remaining",
                "agent_id",
            ]
        );
    }
}
