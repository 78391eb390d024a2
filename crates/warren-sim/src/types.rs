//! Per-world simulation state: rooms, cubes, agents.
//!
//! These structs are the complete mutable state of one world. The
//! checkpoint codec serializes them verbatim, so every field added here
//! must also be added to the blob layout in [`checkpoint`](crate::checkpoint).

use crate::consts::{MAX_CUBES_PER_ROOM, NUM_ROOMS};
use smallvec::SmallVec;

/// One movable cube.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cube {
    /// Position on the ground plane.
    pub pos: [f32; 2],
    /// Velocity, units per tick.
    pub vel: [f32; 2],
}

/// One room of the level: geometry generated at reset plus the dynamic
/// state that evolves while the episode runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Room {
    /// X position of the door gap center in this room's far wall.
    pub door_x: f32,
    /// Center of the pressure plate that opens the door.
    pub button: [f32; 2],
    /// Key spawn position, or `None` if this room's door needs no key.
    pub key: Option<[f32; 2]>,
    /// Whether the key has been picked up off the floor.
    pub key_taken: bool,
    /// Whether the door gap currently lets bodies through.
    pub door_open: bool,
    /// Whether an agent or cube currently stands on the button.
    pub button_pressed: bool,
    /// Movable cubes spawned in this room. Positions move freely; the
    /// room assignment is fixed for the episode.
    pub cubes: SmallVec<[Cube; MAX_CUBES_PER_ROOM]>,
}

/// Identifies one cube by its spawn room and slot within that room.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CubeRef {
    /// Spawn room index.
    pub room: usize,
    /// Index into that room's cube list.
    pub slot: usize,
}

impl CubeRef {
    /// Sentinel for "not holding anything" in the flat i32 encoding.
    pub const NONE_CODE: i32 = -1;

    /// Flat i32 encoding used by the checkpoint codec: `-1` for none,
    /// otherwise `room * MAX_CUBES_PER_ROOM + slot`.
    pub fn code(this: Option<CubeRef>) -> i32 {
        match this {
            None => Self::NONE_CODE,
            Some(r) => (r.room * MAX_CUBES_PER_ROOM + r.slot) as i32,
        }
    }

    /// Decode the flat encoding; `None` if the code is the sentinel,
    /// `Err` if it is outside the representable range.
    pub fn from_code(code: i32) -> Result<Option<CubeRef>, i32> {
        if code == Self::NONE_CODE {
            return Ok(None);
        }
        let max = (NUM_ROOMS * MAX_CUBES_PER_ROOM) as i32;
        if code < 0 || code >= max {
            return Err(code);
        }
        Ok(Some(CubeRef {
            room: code as usize / MAX_CUBES_PER_ROOM,
            slot: code as usize % MAX_CUBES_PER_ROOM,
        }))
    }
}

/// One agent. Persistent across episodes; respawned in place at reset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Agent {
    /// Position on the ground plane.
    pub pos: [f32; 2],
    /// Velocity, units per tick.
    pub vel: [f32; 2],
    /// Yaw, radians, counter-clockwise about Z; `0` faces +Y.
    pub theta: f32,
    /// Cube currently held, if any.
    pub grab: Option<CubeRef>,
    /// Episode high-water mark of the agent's Y position.
    pub progress: f32,
    /// Reward published for the last tick.
    pub reward: f32,
    /// Episode-termination flag published for the last tick.
    pub done: bool,
    /// Highest room index entered this episode (sparse reward bookkeeping).
    pub max_room: i32,
    /// Whether the agent has passed the exit this episode.
    pub exited: bool,
    /// Bitmask of room keys this agent has collected (bit `r` = room `r`).
    pub key_mask: u32,
}

impl Default for Agent {
    fn default() -> Self {
        Self {
            pos: [0.0, 0.0],
            vel: [0.0, 0.0],
            theta: 0.0,
            grab: None,
            progress: 0.0,
            reward: 0.0,
            done: false,
            max_room: 0,
            exited: false,
            key_mask: 0,
        }
    }
}

impl Agent {
    /// Unit forward vector for the current yaw. `theta = 0` is +Y;
    /// positive yaw rotates counter-clockwise.
    pub fn forward(&self) -> [f32; 2] {
        [-self.theta.sin(), self.theta.cos()]
    }

    /// Room index the agent currently stands in, clamped to the level.
    pub fn room_index(&self) -> usize {
        let idx = (self.pos[1] / crate::consts::ROOM_LENGTH).floor() as i64;
        idx.clamp(0, NUM_ROOMS as i64 - 1) as usize
    }
}

/// What a lidar ray or room-entity slot saw. Encoded into observation
/// lanes as the discriminant cast to `f32`; `None` doubles as the
/// zero-padding value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum EntityKind {
    /// Nothing (ray miss, padded slot).
    #[default]
    None,
    /// A movable cube.
    Cube,
    /// A border or separating wall.
    Wall,
    /// A closed door gap.
    Door,
    /// Another agent.
    Agent,
    /// A pressure plate.
    Button,
    /// An uncollected key.
    Key,
}

impl EntityKind {
    /// The observation-lane encoding.
    pub fn code(self) -> f32 {
        self as u32 as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_ref_codes_round_trip() {
        assert_eq!(CubeRef::code(None), -1);
        assert_eq!(CubeRef::from_code(-1), Ok(None));
        for room in 0..NUM_ROOMS {
            for slot in 0..MAX_CUBES_PER_ROOM {
                let r = CubeRef { room, slot };
                assert_eq!(CubeRef::from_code(CubeRef::code(Some(r))), Ok(Some(r)));
            }
        }
    }

    #[test]
    fn cube_ref_rejects_out_of_range() {
        let max = (NUM_ROOMS * MAX_CUBES_PER_ROOM) as i32;
        assert_eq!(CubeRef::from_code(max), Err(max));
        assert_eq!(CubeRef::from_code(-2), Err(-2));
    }

    #[test]
    fn forward_vector_tracks_yaw() {
        let mut a = Agent::default();
        let f = a.forward();
        assert!((f[0] - 0.0).abs() < 1e-6 && (f[1] - 1.0).abs() < 1e-6);

        a.theta = std::f32::consts::FRAC_PI_2;
        let f = a.forward();
        assert!((f[0] + 1.0).abs() < 1e-6 && f[1].abs() < 1e-6);
    }

    #[test]
    fn room_index_clamps_to_level() {
        let mut a = Agent::default();
        a.pos[1] = -5.0;
        assert_eq!(a.room_index(), 0);
        a.pos[1] = 25.0;
        assert_eq!(a.room_index(), 1);
        a.pos[1] = 1000.0;
        assert_eq!(a.room_index(), NUM_ROOMS - 1);
    }

    #[test]
    fn entity_kind_codes_are_stable() {
        assert_eq!(EntityKind::None.code(), 0.0);
        assert_eq!(EntityKind::Cube.code(), 1.0);
        assert_eq!(EntityKind::Wall.code(), 2.0);
        assert_eq!(EntityKind::Door.code(), 3.0);
        assert_eq!(EntityKind::Agent.code(), 4.0);
        assert_eq!(EntityKind::Button.code(), 5.0);
        assert_eq!(EntityKind::Key.code(), 6.0);
    }
}
