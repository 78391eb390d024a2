//! Strongly-typed identifiers for export slots, episodes, and ticks.

use std::fmt;

/// Identifies one exported tensor slot.
///
/// The discriminant order is the canonical slot order of the export
/// schema: every consumer that walks "all slots" walks [`ExportId::ALL`],
/// and the rollout transfer protocol copies observation and stat buffers
/// in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ExportId {
    /// Per-world reset flag, consumed and cleared by the next tick.
    Reset,
    /// Per-agent discrete action records.
    Action,
    /// Per-agent scalar reward for the last tick.
    Reward,
    /// Per-agent episode-termination flag.
    Done,
    /// Per-agent self observation vector.
    SelfObservation,
    /// Per-agent constant agent index.
    AgentId,
    /// Per-agent observations of the other agents.
    PartnerObservations,
    /// Per-agent observations of the current room's entities.
    RoomEntityObservations,
    /// Per-agent observation of the current room's exit door.
    DoorObservation,
    /// Per-agent lidar depth samples.
    Lidar,
    /// Per-agent steps remaining in the episode.
    StepsRemaining,
    /// Per-world opaque checkpoint blob.
    Checkpoint,
    /// Per-world checkpoint-load flag, consumed and cleared by the next tick.
    CheckpointLoad,
    /// Per-world checkpoint-save flag, level-triggered and caller-cleared.
    CheckpointSave,
}

impl ExportId {
    /// Number of export slots.
    pub const COUNT: usize = 14;

    /// All slots in canonical order.
    pub const ALL: [ExportId; Self::COUNT] = [
        ExportId::Reset,
        ExportId::Action,
        ExportId::Reward,
        ExportId::Done,
        ExportId::SelfObservation,
        ExportId::AgentId,
        ExportId::PartnerObservations,
        ExportId::RoomEntityObservations,
        ExportId::DoorObservation,
        ExportId::Lidar,
        ExportId::StepsRemaining,
        ExportId::Checkpoint,
        ExportId::CheckpointLoad,
        ExportId::CheckpointSave,
    ];

    /// Canonical index of this slot.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable lowercase name used in schemas and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ExportId::Reset => "reset",
            ExportId::Action => "action",
            ExportId::Reward => "reward",
            ExportId::Done => "done",
            ExportId::SelfObservation => "self_observation",
            ExportId::AgentId => "agent_id",
            ExportId::PartnerObservations => "partner_observations",
            ExportId::RoomEntityObservations => "room_entity_observations",
            ExportId::DoorObservation => "door_observation",
            ExportId::Lidar => "lidar",
            ExportId::StepsRemaining => "steps_remaining",
            ExportId::Checkpoint => "checkpoint",
            ExportId::CheckpointLoad => "checkpoint_load",
            ExportId::CheckpointSave => "checkpoint_save",
        }
    }
}

impl fmt::Display for ExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Globally unique episode identifier.
///
/// Drawn from a manager-wide [`EpisodeCounter`](crate::EpisodeCounter);
/// strictly increasing across all worlds, never reused within a manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeId(pub u32);

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EpisodeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing tick counter.
///
/// Incremented each time the simulation advances all worlds one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
