//! Procedural level generation.
//!
//! # Design
//!
//! Generation is the only consumer of randomness in the simulation. Each
//! reset draws a fresh ChaCha8 stream seeded from the world index and
//! that world's episode ordinal (its reset count), so the layout of
//! episode N of world W is a pure function of `(W, N)` — independent of
//! how many worlds exist, which worker advances them, or how episode ids
//! interleave globally. With [`SimFlags::USE_FIXED_WORLD`] the seed is a
//! single constant and every episode of every world gets the same layout.
//!
//! The draw order below is part of the determinism contract: per room,
//! door x, button x/y, cube count, cube positions, key presence, key
//! position; then per agent, spawn x/y and yaw.

use crate::consts::{
    MAX_CUBES_PER_ROOM, NUM_AGENTS, NUM_ROOMS, ROOM_LENGTH, WORLD_WIDTH,
};
use crate::types::{Cube, Room};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;
use warren_core::SimFlags;

/// Seed used for every episode when [`SimFlags::USE_FIXED_WORLD`] is set.
const FIXED_LAYOUT_SEED: u64 = 0x4649_5845;

/// Clearance kept between generated entities and room walls.
const INTERIOR_MARGIN: f32 = 2.0;

/// Clearance kept between a door gap and the side walls.
const DOOR_EDGE_MARGIN: f32 = 1.0;

/// Where one agent starts an episode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSpawn {
    /// Spawn position, near the bottom wall.
    pub pos: [f32; 2],
    /// Spawn yaw.
    pub theta: f32,
}

/// A freshly generated episode layout.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedLevel {
    /// Room geometry with dynamic state zeroed.
    pub rooms: [Room; NUM_ROOMS],
    /// One spawn per agent.
    pub spawns: [AgentSpawn; NUM_AGENTS],
}

/// Generate the layout for episode `episode_ordinal` of world `world_idx`.
///
/// `door_width` bounds where door gaps may be placed so the gap always
/// fits inside the separating wall.
pub fn generate(
    world_idx: u32,
    episode_ordinal: u32,
    flags: SimFlags,
    door_width: f32,
) -> GeneratedLevel {
    let seed = if flags.contains(SimFlags::USE_FIXED_WORLD) {
        FIXED_LAYOUT_SEED
    } else {
        (u64::from(world_idx) << 32) | u64::from(episode_ordinal)
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let rooms = std::array::from_fn(|r| generate_room(&mut rng, r, door_width));
    let spawns = std::array::from_fn(|_| generate_spawn(&mut rng));

    GeneratedLevel { rooms, spawns }
}

fn generate_room(rng: &mut ChaCha8Rng, room_idx: usize, door_width: f32) -> Room {
    let half_width = WORLD_WIDTH / 2.0;
    let door_reach = half_width - door_width / 2.0 - DOOR_EDGE_MARGIN;
    let door_x = rng.random_range(-door_reach..door_reach);

    let y_lo = room_idx as f32 * ROOM_LENGTH + INTERIOR_MARGIN;
    let y_hi = (room_idx as f32 + 1.0) * ROOM_LENGTH - INTERIOR_MARGIN;
    let x_lo = -half_width + INTERIOR_MARGIN;
    let x_hi = half_width - INTERIOR_MARGIN;

    let button = [rng.random_range(x_lo..x_hi), rng.random_range(y_lo..y_hi)];

    let cube_count = rng.random_range(0..=MAX_CUBES_PER_ROOM);
    let mut cubes: SmallVec<[Cube; MAX_CUBES_PER_ROOM]> = SmallVec::new();
    for _ in 0..cube_count {
        cubes.push(Cube {
            pos: [rng.random_range(x_lo..x_hi), rng.random_range(y_lo..y_hi)],
            vel: [0.0, 0.0],
        });
    }

    let key = if rng.random_bool(0.5) {
        Some([rng.random_range(x_lo..x_hi), rng.random_range(y_lo..y_hi)])
    } else {
        None
    };

    Room {
        door_x,
        button,
        key,
        key_taken: false,
        door_open: false,
        button_pressed: false,
        cubes,
    }
}

fn generate_spawn(rng: &mut ChaCha8Rng) -> AgentSpawn {
    let reach = WORLD_WIDTH / 2.0 - INTERIOR_MARGIN;
    AgentSpawn {
        pos: [rng.random_range(-reach..reach), rng.random_range(0.8..1.6)],
        theta: rng.random_range(-std::f32::consts::PI..std::f32::consts::PI),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOOR_WIDTH: f32 = 8.0;

    fn assert_in_bounds(level: &GeneratedLevel) {
        let half_width = WORLD_WIDTH / 2.0;
        for (r, room) in level.rooms.iter().enumerate() {
            let y_lo = r as f32 * ROOM_LENGTH;
            let y_hi = (r as f32 + 1.0) * ROOM_LENGTH;
            assert!(room.door_x.abs() + DOOR_WIDTH / 2.0 < half_width);
            assert!(room.button[0].abs() < half_width);
            assert!(room.button[1] > y_lo && room.button[1] < y_hi);
            assert!(room.cubes.len() <= MAX_CUBES_PER_ROOM);
            for cube in &room.cubes {
                assert!(cube.pos[0].abs() < half_width);
                assert!(cube.pos[1] > y_lo && cube.pos[1] < y_hi);
                assert_eq!(cube.vel, [0.0, 0.0]);
            }
            if let Some(key) = room.key {
                assert!(key[0].abs() < half_width);
                assert!(key[1] > y_lo && key[1] < y_hi);
            }
            assert!(!room.key_taken && !room.door_open && !room.button_pressed);
        }
        for spawn in &level.spawns {
            assert!(spawn.pos[0].abs() < half_width);
            assert!(spawn.pos[1] > 0.0 && spawn.pos[1] < 2.0, "spawn near bottom wall");
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate(3, 7, SimFlags::DEFAULT, DOOR_WIDTH);
        let b = generate(3, 7, SimFlags::DEFAULT, DOOR_WIDTH);
        assert_eq!(a, b);
    }

    #[test]
    fn layouts_vary_by_world_and_episode() {
        let base = generate(0, 0, SimFlags::DEFAULT, DOOR_WIDTH);
        assert_ne!(base, generate(0, 1, SimFlags::DEFAULT, DOOR_WIDTH));
        assert_ne!(base, generate(1, 0, SimFlags::DEFAULT, DOOR_WIDTH));
    }

    #[test]
    fn fixed_world_ignores_world_and_episode() {
        let a = generate(0, 5, SimFlags::USE_FIXED_WORLD, DOOR_WIDTH);
        let b = generate(9, 0, SimFlags::USE_FIXED_WORLD, DOOR_WIDTH);
        assert_eq!(a, b);
    }

    #[test]
    fn generated_geometry_stays_in_bounds() {
        for world in 0..4 {
            for episode in 0..16 {
                assert_in_bounds(&generate(world, episode, SimFlags::DEFAULT, DOOR_WIDTH));
            }
        }
    }
}
