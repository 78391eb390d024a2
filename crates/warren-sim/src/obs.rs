//! Observation writers: self, partner, room entities, door, lidar.
//!
//! Observations are pure functions of world state, recomputed in full
//! every tick after the state update. Distances are normalized by
//! [`WORLD_LENGTH`], bearings by pi; entity types use the
//! [`EntityKind`] lane encoding.

use crate::consts::{
    MAX_OBSERVATIONS_PER_AGENT, NUM_AGENTS, NUM_LIDAR_SAMPLES, NUM_ROOMS, ROOM_LENGTH,
    SELF_OBS_DIM, WORLD_LENGTH, WORLD_WIDTH,
};
use crate::lanes::WorldLanes;
use crate::types::EntityKind;
use crate::world::World;
use std::f32::consts::PI;

const RAY_EPS: f32 = 1e-4;

/// Write every observation lane of one world: self, partner, room
/// entities, door, lidar, steps remaining, agent id.
pub(crate) fn write_all(world: &World, lanes: &mut WorldLanes<'_>) {
    for i in 0..NUM_AGENTS {
        write_self(world, i, &mut lanes.self_obs[i * SELF_OBS_DIM..(i + 1) * SELF_OBS_DIM]);

        let partner_w = (NUM_AGENTS - 1) * 3;
        write_partners(world, i, &mut lanes.partner_obs[i * partner_w..(i + 1) * partner_w]);

        let room_w = MAX_OBSERVATIONS_PER_AGENT * 3;
        write_room_entities(
            world,
            i,
            &mut lanes.room_entity_obs[i * room_w..(i + 1) * room_w],
        );

        write_door(world, i, &mut lanes.door_obs[i * 3..(i + 1) * 3]);

        let lidar_w = NUM_LIDAR_SAMPLES * 2;
        write_lidar(world, i, &mut lanes.lidar[i * lidar_w..(i + 1) * lidar_w]);

        lanes.steps_remaining[i] = world.steps_remaining;
        lanes.agent_id[i] = i as i32;
    }
}

fn write_self(world: &World, i: usize, out: &mut [f32]) {
    let a = &world.agents[i];
    let room = a.room_index();
    let room_y = a.pos[1] - room as f32 * ROOM_LENGTH;

    // Rooms span the full width, so the room-relative x axis coincides
    // with the global one.
    out[0] = a.pos[0] / WORLD_LENGTH;
    out[1] = room_y / WORLD_LENGTH;
    out[2] = a.pos[0] / WORLD_LENGTH;
    out[3] = a.pos[1] / WORLD_LENGTH;
    // Agents move on the ground plane; the z lane is kept for layout
    // compatibility and is always zero.
    out[4] = 0.0;
    out[5] = a.progress / WORLD_LENGTH;
    out[6] = a.theta / PI;
    out[7] = if a.grab.is_some() { 1.0 } else { 0.0 };
}

fn write_partners(world: &World, i: usize, out: &mut [f32]) {
    let mut slot = 0;
    for (j, partner) in world.agents.iter().enumerate() {
        if j == i {
            continue;
        }
        let (r, theta) = polar_to(world, i, partner.pos);
        out[slot * 3] = r;
        out[slot * 3 + 1] = theta;
        out[slot * 3 + 2] = if partner.grab.is_some() { 1.0 } else { 0.0 };
        slot += 1;
    }
}

fn write_room_entities(world: &World, i: usize, out: &mut [f32]) {
    out.fill(0.0);
    let room = &world.rooms[world.agents[i].room_index()];

    let mut slot = 0;
    let mut push = |pos: [f32; 2], kind: EntityKind, out: &mut [f32]| {
        if slot >= MAX_OBSERVATIONS_PER_AGENT {
            return;
        }
        let (r, theta) = polar_to(world, i, pos);
        out[slot * 3] = r;
        out[slot * 3 + 1] = theta;
        out[slot * 3 + 2] = kind.code();
        slot += 1;
    };

    for cube in &room.cubes {
        push(cube.pos, EntityKind::Cube, out);
    }
    push(room.button, EntityKind::Button, out);
    if let Some(key) = room.key {
        if !room.key_taken {
            push(key, EntityKind::Key, out);
        }
    }
}

fn write_door(world: &World, i: usize, out: &mut [f32]) {
    let room_idx = world.agents[i].room_index();
    let room = &world.rooms[room_idx];
    let door_pos = [room.door_x, (room_idx as f32 + 1.0) * ROOM_LENGTH];
    let (r, theta) = polar_to(world, i, door_pos);
    out[0] = r;
    out[1] = theta;
    out[2] = if room.door_open { 1.0 } else { 0.0 };
}

fn write_lidar(world: &World, i: usize, out: &mut [f32]) {
    let a = &world.agents[i];
    for sample in 0..NUM_LIDAR_SAMPLES {
        let angle = a.theta + sample as f32 * (2.0 * PI / NUM_LIDAR_SAMPLES as f32);
        let dir = [-angle.sin(), angle.cos()];
        match cast_ray(world, i, a.pos, dir) {
            Some((t, kind)) => {
                out[sample * 2] = t / WORLD_LENGTH;
                out[sample * 2 + 1] = kind.code();
            }
            None => {
                out[sample * 2] = 0.0;
                out[sample * 2 + 1] = EntityKind::None.code();
            }
        }
    }
}

/// Distance and signed bearing from agent `i` to `target`, normalized.
fn polar_to(world: &World, i: usize, target: [f32; 2]) -> (f32, f32) {
    let a = &world.agents[i];
    let v = [target[0] - a.pos[0], target[1] - a.pos[1]];
    let dist = (v[0] * v[0] + v[1] * v[1]).sqrt();
    let bearing = signed_bearing(a.forward(), v);
    (dist / WORLD_LENGTH, bearing / PI)
}

/// Signed angle from `forward` to `v`, radians, counter-clockwise
/// positive, in `(-pi, pi]`. Zero-length `v` reads as straight ahead.
fn signed_bearing(forward: [f32; 2], v: [f32; 2]) -> f32 {
    let cross = forward[0] * v[1] - forward[1] * v[0];
    let dot = forward[0] * v[0] + forward[1] * v[1];
    if cross == 0.0 && dot == 0.0 {
        return 0.0;
    }
    cross.atan2(dot)
}

/// Nearest hit along `origin + t * dir`, or `None` if the ray leaves the
/// level through an open gap.
fn cast_ray(
    world: &World,
    self_idx: usize,
    origin: [f32; 2],
    dir: [f32; 2],
) -> Option<(f32, EntityKind)> {
    let half_width = WORLD_WIDTH / 2.0;
    let gap = world.params.door_width / 2.0;
    let mut best: Option<(f32, EntityKind)> = None;

    let mut consider = |hit: Option<f32>, kind: EntityKind| {
        if let Some(t) = hit {
            if best.map_or(true, |(bt, _)| t < bt) {
                best = Some((t, kind));
            }
        }
    };

    // Border walls: left, right, bottom.
    consider(
        ray_vs_vertical(origin, dir, -half_width, 0.0, WORLD_LENGTH),
        EntityKind::Wall,
    );
    consider(
        ray_vs_vertical(origin, dir, half_width, 0.0, WORLD_LENGTH),
        EntityKind::Wall,
    );
    consider(
        ray_vs_horizontal(origin, dir, 0.0, -half_width, half_width),
        EntityKind::Wall,
    );

    // Separating walls with their door gaps; the last one is the exit.
    for (k, room) in world.rooms.iter().enumerate() {
        let y = (k as f32 + 1.0) * ROOM_LENGTH;
        consider(
            ray_vs_horizontal(origin, dir, y, -half_width, room.door_x - gap),
            EntityKind::Wall,
        );
        consider(
            ray_vs_horizontal(origin, dir, y, room.door_x + gap, half_width),
            EntityKind::Wall,
        );
        if !room.door_open {
            consider(
                ray_vs_horizontal(origin, dir, y, room.door_x - gap, room.door_x + gap),
                EntityKind::Door,
            );
        }
    }

    for room in &world.rooms {
        for cube in &room.cubes {
            consider(
                ray_vs_circle(origin, dir, cube.pos, world.cube_radius),
                EntityKind::Cube,
            );
        }
    }

    for (j, other) in world.agents.iter().enumerate() {
        if j == self_idx {
            continue;
        }
        consider(
            ray_vs_circle(origin, dir, other.pos, world.agent_radius),
            EntityKind::Agent,
        );
    }

    best
}

fn ray_vs_vertical(origin: [f32; 2], dir: [f32; 2], x: f32, y0: f32, y1: f32) -> Option<f32> {
    if dir[0].abs() < RAY_EPS {
        return None;
    }
    let t = (x - origin[0]) / dir[0];
    if t < RAY_EPS {
        return None;
    }
    let y = origin[1] + t * dir[1];
    (y >= y0 && y <= y1).then_some(t)
}

fn ray_vs_horizontal(origin: [f32; 2], dir: [f32; 2], y: f32, x0: f32, x1: f32) -> Option<f32> {
    if dir[1].abs() < RAY_EPS {
        return None;
    }
    let t = (y - origin[1]) / dir[1];
    if t < RAY_EPS {
        return None;
    }
    let x = origin[0] + t * dir[0];
    (x >= x0 && x <= x1).then_some(t)
}

fn ray_vs_circle(origin: [f32; 2], dir: [f32; 2], center: [f32; 2], radius: f32) -> Option<f32> {
    let oc = [origin[0] - center[0], origin[1] - center[1]];
    let b = oc[0] * dir[0] + oc[1] * dir[1];
    let c = oc[0] * oc[0] + oc[1] * oc[1] - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt = disc.sqrt();
    let near = -b - sqrt;
    if near >= RAY_EPS {
        return Some(near);
    }
    let far = -b + sqrt;
    (far >= RAY_EPS).then_some(far)
}
