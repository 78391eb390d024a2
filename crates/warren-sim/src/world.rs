//! One world's state machine: reset, restore, or advance, once per tick.
//!
//! # Design
//!
//! [`World::tick`] is the single entry point both execution backends
//! drive. Each call consumes the world's flag cells, applies exactly one
//! of three transitions, then republishes every exported row:
//!
//! * **reset** — requested flag, or episode over with auto-reset: draw a
//!   fresh episode id, regenerate the level, respawn the agents;
//! * **restore** — checkpoint-load flag: overwrite live state from the
//!   world's blob instead of advancing (an invalid blob falls through to
//!   a normal advance and is counted);
//! * **advance** — apply the action records, integrate movement, resolve
//!   pushes, update buttons/doors/keys, accumulate rewards, and retire
//!   one step of the episode clock.
//!
//! A reset requested in the same tick as a load wins; the load flag is
//! still consumed.
//!
//! Stepping never draws randomness — generation owns the RNG — and all
//! iteration orders are fixed, so a world's exported rows are a pure
//! function of its construction parameters and the flag/action history.

use crate::checkpoint::{self, Checkpoint};
use crate::consts::{
    CARRY_DISTANCE, DRAG_COEFF, EPISODE_LEN, GRAB_RANGE, KEY_PICKUP_RADIUS,
    MAX_CUBES_PER_ROOM, MOVE_ACCEL, NUM_AGENTS, NUM_ROOMS, REWARD_PER_DIST, ROOM_LENGTH,
    SLACK_REWARD, SPARSE_EXIT_REWARD, SPARSE_ROOM_REWARD, TURN_RATE, WORLD_LENGTH,
    WORLD_WIDTH,
};
use crate::init::WorldInit;
use crate::lanes::WorldLanes;
use crate::level;
use crate::obs;
use crate::types::{Agent, CubeRef, Room};
use smallvec::SmallVec;
use std::f32::consts::PI;
use warren_assets::SimObject;
use warren_core::{Action, EpisodeId, RewardMode, SimFlags, TickId, ACTION_COMPONENTS};

/// Per-world behavior knobs, identical for every world of one manager.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldParams {
    /// Reset a world by itself on the tick after its episode ends.
    pub auto_reset: bool,
    /// Feature flags.
    pub flags: SimFlags,
    /// Reward shaping.
    pub reward_mode: RewardMode,
    /// Side length of the pressure plates.
    pub button_width: f32,
    /// Width of the door gaps.
    pub door_width: f32,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            auto_reset: false,
            flags: SimFlags::DEFAULT,
            reward_mode: RewardMode::Dense,
            button_width: 1.3,
            door_width: 8.0,
        }
    }
}

/// What one [`World::tick`] call did, for metrics aggregation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickEvents {
    /// The world advanced one physics step.
    pub advanced: bool,
    /// The world reset into a fresh episode.
    pub reset: bool,
    /// A checkpoint blob was serialized this tick.
    pub checkpoint_saved: bool,
    /// Live state was restored from the blob this tick.
    pub checkpoint_loaded: bool,
    /// A load was requested but the blob failed validation.
    pub checkpoint_load_failed: bool,
    /// The episode ended this tick.
    pub episode_completed: bool,
    /// Forward progress gained this tick, summed over agents.
    pub progress_delta: f32,
}

/// The complete simulation state of one world.
pub struct World {
    idx: u32,
    pub(crate) params: WorldParams,
    init: WorldInit,
    pub(crate) episode_id: EpisodeId,
    pub(crate) episode_ordinal: u32,
    next_ordinal: u32,
    pub(crate) steps_remaining: i32,
    pub(crate) rooms: [Room; NUM_ROOMS],
    pub(crate) agents: [Agent; NUM_AGENTS],
    tick: TickId,
    // Physics terms derived once from the asset table.
    pub(crate) agent_radius: f32,
    pub(crate) cube_radius: f32,
    agent_decay: f32,
    cube_decay: f32,
    agent_inv_mass: f32,
    cube_inv_mass: f32,
}

// Worlds move between worker threads by value.
const _: () = {
    fn assert_send<T: Send>() {}
    fn check() {
        assert_send::<World>();
    }
};

impl World {
    /// Create world `idx` in its pre-episode state.
    ///
    /// The state is not meaningful until the first reset tick; the
    /// manager triggers one for every world during construction.
    pub fn new(idx: u32, params: WorldParams, init: WorldInit) -> Self {
        let agent_body = init.objects.body(SimObject::Agent);
        let cube_body = init.objects.body(SimObject::Cube);
        let agent_radius = init.objects.half_extents(SimObject::Agent)[0];
        let cube_radius = init.objects.half_extents(SimObject::Cube)[0];
        let agent_decay = 1.0 - agent_body.friction.mu_d * DRAG_COEFF;
        let cube_decay = 1.0 - cube_body.friction.mu_d * DRAG_COEFF;
        let agent_inv_mass = agent_body.inv_mass;
        let cube_inv_mass = cube_body.inv_mass;
        Self {
            idx,
            params,
            episode_id: EpisodeId(0),
            episode_ordinal: 0,
            next_ordinal: 0,
            steps_remaining: EPISODE_LEN,
            rooms: Default::default(),
            agents: Default::default(),
            tick: TickId(0),
            agent_radius,
            cube_radius,
            agent_decay,
            cube_decay,
            agent_inv_mass,
            cube_inv_mass,
            init,
        }
    }

    /// This world's index.
    pub fn index(&self) -> u32 {
        self.idx
    }

    /// Consume flags, apply one transition, republish this world's rows.
    pub fn tick(&mut self, lanes: &mut WorldLanes<'_>) -> TickEvents {
        let mut ev = TickEvents::default();

        let reset_req = lanes.reset[0] != 0
            || (self.params.auto_reset && self.agents.iter().all(|a| a.done));
        let load_req = lanes.checkpoint_load[0] != 0;
        let save_req = lanes.checkpoint_save[0] != 0;
        lanes.reset[0] = 0;
        lanes.checkpoint_load[0] = 0;

        let actions = read_actions(lanes);

        if reset_req {
            // A simultaneous load loses; its flag was already consumed.
            self.reset();
            ev.reset = true;
        } else if load_req {
            match checkpoint::decode(lanes.checkpoint) {
                Ok(cp) => {
                    self.restore(cp);
                    ev.checkpoint_loaded = true;
                }
                Err(_) => {
                    ev.checkpoint_load_failed = true;
                    self.advance(actions, &mut ev);
                }
            }
        } else {
            self.advance(actions, &mut ev);
        }

        self.publish(lanes);
        if save_req {
            checkpoint::encode(&self.to_checkpoint(), lanes.checkpoint);
            ev.checkpoint_saved = true;
        }
        if let Some(viewer) = &self.init.viewer {
            viewer.world_stepped(self.idx, self.tick);
        }
        self.tick = TickId(self.tick.0 + 1);
        ev
    }

    // ── Transitions ─────────────────────────────────────────────

    fn reset(&mut self) {
        let ordinal = self.next_ordinal;
        self.next_ordinal = self.next_ordinal.wrapping_add(1);
        self.episode_id = self.init.episodes.next();
        self.episode_ordinal = ordinal;
        self.steps_remaining = EPISODE_LEN;

        let generated = level::generate(self.idx, ordinal, self.params.flags, self.params.door_width);
        self.rooms = generated.rooms;
        for (agent, spawn) in self.agents.iter_mut().zip(generated.spawns) {
            *agent = Agent {
                pos: spawn.pos,
                theta: spawn.theta,
                progress: spawn.pos[1],
                ..Agent::default()
            };
        }
    }

    fn restore(&mut self, cp: Checkpoint) {
        self.episode_id = cp.episode_id;
        self.episode_ordinal = cp.episode_ordinal;
        self.next_ordinal = cp.episode_ordinal.wrapping_add(1);
        self.steps_remaining = cp.steps_remaining;
        self.rooms = cp.rooms;
        self.agents = cp.agents;
    }

    fn advance(&mut self, actions: [Action; NUM_AGENTS], ev: &mut TickEvents) {
        for (i, action) in actions.iter().enumerate() {
            if action.wants_grab_toggle() {
                self.toggle_grab(i);
            }
        }
        for (i, action) in actions.iter().enumerate() {
            self.step_agent(i, *action);
        }
        for i in 0..NUM_AGENTS {
            self.place_held_cube(i);
        }
        self.integrate_cubes();
        self.resolve_pushes();
        self.separate_cubes();
        self.update_triggers();

        let delta = self.apply_rewards();
        self.init.progress.add(delta);
        ev.progress_delta = delta;

        let ignore_clock = self.params.flags.contains(SimFlags::IGNORE_EPISODE_LENGTH);
        if !ignore_clock {
            self.steps_remaining = (self.steps_remaining - 1).max(0);
        }
        let timed_out = !ignore_clock && self.steps_remaining == 0;
        let all_exited = self.agents.iter().all(|a| a.exited);
        let over = timed_out || all_exited;
        let was_over = self.agents[0].done;
        for agent in self.agents.iter_mut() {
            agent.done = over;
        }
        if over && !was_over {
            ev.episode_completed = true;
        }
        ev.advanced = true;
    }

    // ── Movement and interaction ────────────────────────────────

    fn toggle_grab(&mut self, i: usize) {
        if self.agents[i].grab.take().is_some() {
            return;
        }
        let pos = self.agents[i].pos;
        let mut best: Option<(f32, CubeRef)> = None;
        for (r, room) in self.rooms.iter().enumerate() {
            for (s, cube) in room.cubes.iter().enumerate() {
                let cand = CubeRef { room: r, slot: s };
                if self.agents.iter().any(|a| a.grab == Some(cand)) {
                    continue;
                }
                let d = dist(pos, cube.pos);
                if d <= GRAB_RANGE && best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, cand));
                }
            }
        }
        if let Some((_, held)) = best {
            self.agents[i].grab = Some(held);
        }
    }

    fn step_agent(&mut self, i: usize, action: Action) {
        let mut a = self.agents[i];
        a.theta = wrap_angle(a.theta + action.turn_fraction() * TURN_RATE);

        let heading = a.theta + action.move_direction();
        let accel = action.move_fraction() * MOVE_ACCEL;
        a.vel[0] = (a.vel[0] - heading.sin() * accel) * self.agent_decay;
        a.vel[1] = (a.vel[1] + heading.cos() * accel) * self.agent_decay;

        let target = [a.pos[0] + a.vel[0], a.pos[1] + a.vel[1]];
        let clamped = self.clamp_position(a.pos, target, self.agent_radius);
        if clamped[0] != target[0] {
            a.vel[0] = 0.0;
        }
        if clamped[1] != target[1] {
            a.vel[1] = 0.0;
        }
        a.pos = clamped;
        self.agents[i] = a;
    }

    fn place_held_cube(&mut self, i: usize) {
        let a = self.agents[i];
        let Some(held) = a.grab else {
            return;
        };
        let forward = a.forward();
        let target = [
            a.pos[0] + forward[0] * CARRY_DISTANCE,
            a.pos[1] + forward[1] * CARRY_DISTANCE,
        ];
        let clamped = self.clamp_position(a.pos, target, self.cube_radius);
        let cube = &mut self.rooms[held.room].cubes[held.slot];
        cube.pos = clamped;
        cube.vel = [0.0, 0.0];
    }

    fn integrate_cubes(&mut self) {
        let held = self.held_cubes();
        for r in 0..NUM_ROOMS {
            for s in 0..self.rooms[r].cubes.len() {
                if held.contains(&CubeRef { room: r, slot: s }) {
                    continue;
                }
                let mut cube = self.rooms[r].cubes[s];
                let target = [cube.pos[0] + cube.vel[0], cube.pos[1] + cube.vel[1]];
                let clamped = self.clamp_position(cube.pos, target, self.cube_radius);
                if clamped[0] != target[0] {
                    cube.vel[0] = 0.0;
                }
                if clamped[1] != target[1] {
                    cube.vel[1] = 0.0;
                }
                cube.pos = clamped;
                cube.vel[0] *= self.cube_decay;
                cube.vel[1] *= self.cube_decay;
                self.rooms[r].cubes[s] = cube;
            }
        }
    }

    fn resolve_pushes(&mut self) {
        let held = self.held_cubes();
        let min_dist = self.agent_radius + self.cube_radius;
        let total_w = self.agent_inv_mass + self.cube_inv_mass;
        let cube_share = self.cube_inv_mass / total_w;

        for i in 0..NUM_AGENTS {
            let mut a = self.agents[i];
            for r in 0..NUM_ROOMS {
                for s in 0..self.rooms[r].cubes.len() {
                    if held.contains(&CubeRef { room: r, slot: s }) {
                        continue;
                    }
                    let mut cube = self.rooms[r].cubes[s];
                    let dx = cube.pos[0] - a.pos[0];
                    let dy = cube.pos[1] - a.pos[1];
                    let d = (dx * dx + dy * dy).sqrt();
                    if d >= min_dist {
                        continue;
                    }
                    let n = if d > 1e-6 { [dx / d, dy / d] } else { [0.0, 1.0] };
                    let overlap = min_dist - d;

                    // Positional correction, inverse-mass weighted.
                    cube.pos[0] += n[0] * overlap * cube_share;
                    cube.pos[1] += n[1] * overlap * cube_share;
                    a.pos[0] -= n[0] * overlap * (1.0 - cube_share);
                    a.pos[1] -= n[1] * overlap * (1.0 - cube_share);

                    // Inelastic impulse along the contact normal.
                    let rel = (a.vel[0] - cube.vel[0]) * n[0] + (a.vel[1] - cube.vel[1]) * n[1];
                    if rel > 0.0 {
                        cube.vel[0] += n[0] * rel * cube_share;
                        cube.vel[1] += n[1] * rel * cube_share;
                        a.vel[0] -= n[0] * rel * (1.0 - cube_share);
                        a.vel[1] -= n[1] * rel * (1.0 - cube_share);
                    }
                    self.rooms[r].cubes[s] = cube;
                }
            }
            // Recoil must not push the agent out of the play area.
            let half = WORLD_WIDTH / 2.0 - self.agent_radius;
            a.pos[0] = a.pos[0].clamp(-half, half);
            a.pos[1] = a.pos[1].max(self.agent_radius);
            self.agents[i] = a;
        }
    }

    fn separate_cubes(&mut self) {
        let held = self.held_cubes();
        let mut free: SmallVec<[CubeRef; NUM_ROOMS * MAX_CUBES_PER_ROOM]> = SmallVec::new();
        for (r, room) in self.rooms.iter().enumerate() {
            for s in 0..room.cubes.len() {
                let cand = CubeRef { room: r, slot: s };
                if !held.contains(&cand) {
                    free.push(cand);
                }
            }
        }

        for a in 0..free.len() {
            for b in a + 1..free.len() {
                let ca = self.rooms[free[a].room].cubes[free[a].slot];
                let cb = self.rooms[free[b].room].cubes[free[b].slot];
                let dx = cb.pos[0] - ca.pos[0];
                let dy = cb.pos[1] - ca.pos[1];
                let d = (dx * dx + dy * dy).sqrt();
                let min_dist = 2.0 * self.cube_radius;
                if d >= min_dist {
                    continue;
                }
                let n = if d > 1e-6 { [dx / d, dy / d] } else { [0.0, 1.0] };
                let shift = (min_dist - d) / 2.0;
                self.rooms[free[a].room].cubes[free[a].slot].pos = [
                    ca.pos[0] - n[0] * shift,
                    ca.pos[1] - n[1] * shift,
                ];
                self.rooms[free[b].room].cubes[free[b].slot].pos = [
                    cb.pos[0] + n[0] * shift,
                    cb.pos[1] + n[1] * shift,
                ];
            }
        }
    }

    fn update_triggers(&mut self) {
        // Keys are collected by walking over them; collection is sticky.
        for i in 0..NUM_AGENTS {
            let pos = self.agents[i].pos;
            for r in 0..NUM_ROOMS {
                let key = self.rooms[r].key;
                if let Some(key_pos) = key {
                    if !self.rooms[r].key_taken && dist(pos, key_pos) <= KEY_PICKUP_RADIUS {
                        self.rooms[r].key_taken = true;
                        self.agents[i].key_mask |= 1 << r;
                    }
                }
            }
        }

        // A plate is pressed while any agent or cube center stands on it.
        // A door is open while its plate is pressed and its key (if any)
        // has been collected.
        let half_plate = self.params.button_width / 2.0;
        let mut cube_positions: SmallVec<[[f32; 2]; NUM_ROOMS * MAX_CUBES_PER_ROOM]> =
            SmallVec::new();
        for room in &self.rooms {
            for cube in &room.cubes {
                cube_positions.push(cube.pos);
            }
        }

        let Self { rooms, agents, .. } = self;
        for room in rooms.iter_mut() {
            let on_plate = |p: [f32; 2]| {
                (p[0] - room.button[0]).abs() <= half_plate
                    && (p[1] - room.button[1]).abs() <= half_plate
            };
            let pressed = agents.iter().any(|a| on_plate(a.pos))
                || cube_positions.iter().any(|&p| on_plate(p));
            room.button_pressed = pressed;
            room.door_open = pressed && (room.key.is_none() || room.key_taken);
        }
    }

    fn apply_rewards(&mut self) -> f32 {
        let mode = self.params.reward_mode;
        let mut total_delta = 0.0;
        for agent in self.agents.iter_mut() {
            let before = agent.progress;
            if agent.pos[1] > agent.progress {
                agent.progress = agent.pos[1];
            }
            let delta = agent.progress - before;
            total_delta += delta;

            let new_rooms = (agent.room_index() as i32 - agent.max_room).max(0);
            agent.max_room += new_rooms;
            let newly_exited = !agent.exited && agent.pos[1] > WORLD_LENGTH;
            if newly_exited {
                agent.exited = true;
            }

            agent.reward = match mode {
                RewardMode::Dense => REWARD_PER_DIST * delta - SLACK_REWARD,
                RewardMode::Sparse => {
                    let mut r = -SLACK_REWARD + new_rooms as f32 * SPARSE_ROOM_REWARD;
                    if newly_exited {
                        r += SPARSE_EXIT_REWARD;
                    }
                    r
                }
            };
        }
        total_delta
    }

    // ── Geometry ────────────────────────────────────────────────

    /// Clamp a move from `start` to `end` for a body of `radius` against
    /// the borders and every separating wall, honoring open door gaps.
    fn clamp_position(&self, start: [f32; 2], end: [f32; 2], radius: f32) -> [f32; 2] {
        let half = WORLD_WIDTH / 2.0 - radius;
        let mut out = [end[0].clamp(-half, half), end[1].max(radius)];
        let gap = self.params.door_width / 2.0;

        for (k, room) in self.rooms.iter().enumerate() {
            let y = (k as f32 + 1.0) * ROOM_LENGTH;
            let fits = room.door_open && (out[0] - room.door_x).abs() + radius <= gap;
            if fits {
                continue;
            }
            if start[1] < y && out[1] > y - radius {
                out[1] = y - radius;
            } else if start[1] > y && out[1] < y + radius {
                out[1] = y + radius;
            }
        }
        out
    }

    fn held_cubes(&self) -> SmallVec<[CubeRef; NUM_AGENTS]> {
        self.agents.iter().filter_map(|a| a.grab).collect()
    }

    // ── Publication ─────────────────────────────────────────────

    fn publish(&self, lanes: &mut WorldLanes<'_>) {
        for (i, agent) in self.agents.iter().enumerate() {
            lanes.reward[i] = agent.reward;
            lanes.done[i] = agent.done as i32;
        }
        obs::write_all(self, lanes);
    }

    fn to_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            episode_id: self.episode_id,
            episode_ordinal: self.episode_ordinal,
            steps_remaining: self.steps_remaining,
            rooms: self.rooms.clone(),
            agents: self.agents,
        }
    }
}

fn read_actions(lanes: &WorldLanes<'_>) -> [Action; NUM_AGENTS] {
    std::array::from_fn(|i| {
        let mut components = [0i32; ACTION_COMPONENTS];
        components
            .copy_from_slice(&lanes.action[i * ACTION_COMPONENTS..(i + 1) * ACTION_COMPONENTS]);
        Action::from_lanes(components)
    })
}

fn wrap_angle(a: f32) -> f32 {
    let wrapped = a.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}

fn dist(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dx * dx + dy * dy).sqrt()
}
