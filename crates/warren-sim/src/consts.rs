//! Fixed geometry, episode, and tuning constants.
//!
//! Everything here is part of the export contract: tensor shapes and the
//! checkpoint layout are derived from these values, so changing one is a
//! schema change (bump [`SCHEMA_VERSION`](crate::SCHEMA_VERSION)).

use std::f32::consts::PI;

/// Rooms stacked along +Y. Agents escape by crossing all of them.
pub const NUM_ROOMS: usize = 3;

/// Depth of one room along the Y axis, in world units.
pub const ROOM_LENGTH: f32 = 20.0;

/// Width of the world along the X axis, in world units. X spans
/// `[-WORLD_WIDTH / 2, WORLD_WIDTH / 2]`.
pub const WORLD_WIDTH: f32 = 20.0;

/// Total level depth: the exit wall sits at `y = WORLD_LENGTH`.
pub const WORLD_LENGTH: f32 = NUM_ROOMS as f32 * ROOM_LENGTH;

/// Upper bound on movable cubes generated per room.
pub const MAX_CUBES_PER_ROOM: usize = 3;

/// Agents per world. Agents are persistent across episodes.
pub const NUM_AGENTS: usize = 2;

/// Lanes in one self-observation row: room-relative x/y, global x/y/z,
/// episode max-progress y, yaw, grabbing flag.
pub const SELF_OBS_DIM: usize = 8;

/// Entity slots in one room-entity observation row (cubes, button, key;
/// zero-padded).
pub const MAX_OBSERVATIONS_PER_AGENT: usize = 5;

/// Lidar rays per agent, evenly spaced over a full turn.
pub const NUM_LIDAR_SAMPLES: usize = 30;

/// Episode length in ticks before timeout.
pub const EPISODE_LEN: i32 = 200;

/// Dense-mode reward per unit of new forward progress.
pub const REWARD_PER_DIST: f32 = 0.05;

/// Per-step penalty subtracted in both reward modes.
pub const SLACK_REWARD: f32 = 0.005;

/// Sparse-mode reward for first entry into a new room.
pub const SPARSE_ROOM_REWARD: f32 = 1.0;

/// Sparse-mode reward for passing the exit.
pub const SPARSE_EXIT_REWARD: f32 = 10.0;

/// Acceleration applied by a full-strength move action, units per tick
/// squared.
pub const MOVE_ACCEL: f32 = 0.35;

/// Yaw change of a full-strength turn action, radians per tick.
pub const TURN_RATE: f32 = PI / 16.0;

/// Scales dynamic friction into a per-tick velocity decay:
/// `vel *= 1 - mu_d * DRAG_COEFF`.
pub const DRAG_COEFF: f32 = 0.5;

/// Maximum distance at which a grab action picks up a cube.
pub const GRAB_RANGE: f32 = 2.5;

/// Distance in front of the agent at which a held cube is carried.
pub const CARRY_DISTANCE: f32 = 1.6;

/// Distance within which walking over a key collects it.
pub const KEY_PICKUP_RADIUS: f32 = 1.0;
