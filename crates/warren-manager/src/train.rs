//! The named tensor bundle trainers consume.

use indexmap::IndexMap;
use warren_core::ExportId;
use warren_exec::{Executor, Tensor};
use warren_sim::{ExportSchema, SCHEMA_VERSION};

fn observation_name(id: ExportId) -> &'static str {
    match id {
        ExportId::SelfObservation => "self",
        ExportId::PartnerObservations => "partners",
        ExportId::RoomEntityObservations => "room_entities",
        ExportId::DoorObservation => "door",
        ExportId::Lidar => "lidar",
        ExportId::StepsRemaining => "steps_remaining",
        ExportId::AgentId => "agent_id",
        _ => panic!("export slot {id} is not an observation"),
    }
}

/// Every train-facing tensor, bundled and named.
///
/// Observation and stat maps preserve the schema's slot order, so a
/// trainer iterating them sees the same order the rollout transfer
/// protocol copies in.
#[derive(Debug)]
pub struct TrainInterface<'a> {
    /// Observation tensors, keyed by stable names, in schema order.
    pub observations: IndexMap<&'static str, Tensor<'a>>,
    /// Per-episode stat tensors, in schema order. Empty for this
    /// simulator.
    pub stats: IndexMap<&'static str, Tensor<'a>>,
    /// Per-agent action records (input).
    pub actions: Tensor<'a>,
    /// Per-agent rewards.
    pub rewards: Tensor<'a>,
    /// Per-agent done flags.
    pub dones: Tensor<'a>,
    /// Per-world reset flags (input).
    pub resets: Tensor<'a>,
    /// Per-agent policy assignments; this simulator exports none.
    pub policy_assignments: Option<Tensor<'a>>,
    /// Version of the export layout these tensors follow.
    pub schema_version: u32,
}

impl<'a> TrainInterface<'a> {
    pub(crate) fn new(exec: &'a dyn Executor) -> Self {
        let mut observations = IndexMap::with_capacity(ExportSchema::OBSERVATIONS.len());
        for id in ExportSchema::OBSERVATIONS {
            observations.insert(observation_name(id), exec.tensor(id));
        }
        let mut stats = IndexMap::with_capacity(ExportSchema::STATS.len());
        for id in ExportSchema::STATS {
            stats.insert(id.name(), exec.tensor(id));
        }
        Self {
            observations,
            stats,
            actions: exec.tensor(ExportId::Action),
            rewards: exec.tensor(ExportId::Reward),
            dones: exec.tensor(ExportId::Done),
            resets: exec.tensor(ExportId::Reset),
            policy_assignments: None,
            schema_version: SCHEMA_VERSION,
        }
    }
}
