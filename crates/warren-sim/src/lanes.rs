//! One world's mutable window into the exported tensors.
//!
//! # Ownership model
//!
//! The execution backend owns the flat export buffers; before a tick it
//! carves them into disjoint per-world [`WorldLanes`], one per world.
//! Because the slices are disjoint `&mut`, worker threads can advance
//! different worlds concurrently with no synchronization, and the borrow
//! checker enforces that no row is shared.
//!
//! Slice lengths are fixed by the export schema; [`WorldLanes::check`]
//! asserts them once at carve time so every later index in the tick is
//! in range by construction.

use crate::consts::{
    MAX_OBSERVATIONS_PER_AGENT, NUM_AGENTS, NUM_LIDAR_SAMPLES, SELF_OBS_DIM,
};
use crate::checkpoint::CHECKPOINT_BYTES;
use warren_core::ACTION_COMPONENTS;

/// Disjoint mutable slices of every export, covering exactly one world.
#[derive(Debug)]
pub struct WorldLanes<'a> {
    /// Reset flag, 1 element.
    pub reset: &'a mut [i32],
    /// Action records, `NUM_AGENTS * ACTION_COMPONENTS` elements.
    pub action: &'a mut [i32],
    /// Rewards, `NUM_AGENTS` elements.
    pub reward: &'a mut [f32],
    /// Done flags, `NUM_AGENTS` elements.
    pub done: &'a mut [i32],
    /// Self observations, `NUM_AGENTS * SELF_OBS_DIM` elements.
    pub self_obs: &'a mut [f32],
    /// Agent indices, `NUM_AGENTS` elements.
    pub agent_id: &'a mut [i32],
    /// Partner observations, `NUM_AGENTS * (NUM_AGENTS - 1) * 3` elements.
    pub partner_obs: &'a mut [f32],
    /// Room-entity observations,
    /// `NUM_AGENTS * MAX_OBSERVATIONS_PER_AGENT * 3` elements.
    pub room_entity_obs: &'a mut [f32],
    /// Door observations, `NUM_AGENTS * 3` elements.
    pub door_obs: &'a mut [f32],
    /// Lidar samples, `NUM_AGENTS * NUM_LIDAR_SAMPLES * 2` elements.
    pub lidar: &'a mut [f32],
    /// Steps remaining, `NUM_AGENTS` elements.
    pub steps_remaining: &'a mut [i32],
    /// Checkpoint blob, `CHECKPOINT_BYTES` elements.
    pub checkpoint: &'a mut [u8],
    /// Checkpoint-load flag, 1 element.
    pub checkpoint_load: &'a mut [i32],
    /// Checkpoint-save flag, 1 element.
    pub checkpoint_save: &'a mut [i32],
}

impl WorldLanes<'_> {
    /// Assert every slice has the length the schema promises.
    ///
    /// # Panics
    ///
    /// Panics with the offending lane's name if a length is wrong; a
    /// mis-carved lane is a backend bug, not a recoverable condition.
    pub fn check(&self) {
        let expect = [
            ("reset", self.reset.len(), 1),
            ("action", self.action.len(), NUM_AGENTS * ACTION_COMPONENTS),
            ("reward", self.reward.len(), NUM_AGENTS),
            ("done", self.done.len(), NUM_AGENTS),
            ("self_obs", self.self_obs.len(), NUM_AGENTS * SELF_OBS_DIM),
            ("agent_id", self.agent_id.len(), NUM_AGENTS),
            (
                "partner_obs",
                self.partner_obs.len(),
                NUM_AGENTS * (NUM_AGENTS - 1) * 3,
            ),
            (
                "room_entity_obs",
                self.room_entity_obs.len(),
                NUM_AGENTS * MAX_OBSERVATIONS_PER_AGENT * 3,
            ),
            ("door_obs", self.door_obs.len(), NUM_AGENTS * 3),
            ("lidar", self.lidar.len(), NUM_AGENTS * NUM_LIDAR_SAMPLES * 2),
            ("steps_remaining", self.steps_remaining.len(), NUM_AGENTS),
            ("checkpoint_load", self.checkpoint_load.len(), 1),
            ("checkpoint_save", self.checkpoint_save.len(), 1),
        ];
        for (name, got, want) in expect {
            assert_eq!(got, want, "lane {name}: {got} elements, schema says {want}");
        }
        assert_eq!(
            self.checkpoint.len(),
            CHECKPOINT_BYTES,
            "lane checkpoint: {} bytes, schema says {CHECKPOINT_BYTES}",
            self.checkpoint.len()
        );
    }
}

/// Backing storage for one world's lanes, for tests and single-world
/// callers that are not driving a full backend.
#[derive(Debug)]
pub struct LaneBuffer {
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

impl Default for LaneBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LaneBuffer {
    /// Zero-initialized storage for one world.
    pub fn new() -> Self {
        Self {
            reset: vec![0; 1],
            action: vec![0; NUM_AGENTS * ACTION_COMPONENTS],
            reward: vec![0.0; NUM_AGENTS],
            done: vec![0; NUM_AGENTS],
            self_obs: vec![0.0; NUM_AGENTS * SELF_OBS_DIM],
            agent_id: vec![0; NUM_AGENTS],
            partner_obs: vec![0.0; NUM_AGENTS * (NUM_AGENTS - 1) * 3],
            room_entity_obs: vec![0.0; NUM_AGENTS * MAX_OBSERVATIONS_PER_AGENT * 3],
            door_obs: vec![0.0; NUM_AGENTS * 3],
            lidar: vec![0.0; NUM_AGENTS * NUM_LIDAR_SAMPLES * 2],
            steps_remaining: vec![0; NUM_AGENTS],
            checkpoint: vec![0; CHECKPOINT_BYTES],
            checkpoint_load: vec![0; 1],
            checkpoint_save: vec![0; 1],
        }
    }

    /// Borrow the storage as one world's lanes.
    pub fn lanes(&mut self) -> WorldLanes<'_> {
        WorldLanes {
            reset: &mut self.reset,
            action: &mut self.action,
            reward: &mut self.reward,
            done: &mut self.done,
            self_obs: &mut self.self_obs,
            agent_id: &mut self.agent_id,
            partner_obs: &mut self.partner_obs,
            room_entity_obs: &mut self.room_entity_obs,
            door_obs: &mut self.door_obs,
            lidar: &mut self.lidar,
            steps_remaining: &mut self.steps_remaining,
            checkpoint: &mut self.checkpoint,
            checkpoint_load: &mut self.checkpoint_load,
            checkpoint_save: &mut self.checkpoint_save,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_buffer_passes_check() {
        let mut buf = LaneBuffer::new();
        buf.lanes().check();
    }

    #[test]
    #[should_panic(expected = "lane reward")]
    fn check_panics_on_wrong_length() {
        let mut buf = LaneBuffer::new();
        buf.reward.push(0.0);
        buf.lanes().check();
    }
}
