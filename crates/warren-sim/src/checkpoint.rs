//! Fixed-size checkpoint blob codec.
//!
//! # Design
//!
//! A checkpoint is one row of the checkpoint tensor: exactly
//! [`CHECKPOINT_BYTES`] bytes, little-endian, fixed layout, no internal
//! length prefixes. The trainer treats it as opaque and may copy rows
//! between worlds or stash them host-side; [`decode`] therefore validates
//! magic, version, and every count before anything is applied, so feeding
//! back arbitrary bytes can fail but never panic.
//!
//! Layout (all offsets fixed):
//!
//! ```text
//! 0   magic            b"WCKP"
//! 4   version          u16, then u16 reserved
//! 8   episode id       u32
//! 12  episode ordinal  u32
//! 16  steps remaining  i32
//! 20  rooms            NUM_ROOMS x 76 bytes
//!       door_x f32, button f32x2,
//!       has_key/key_taken/door_open/button_pressed u8x4,
//!       key f32x2, cube_count u32,
//!       MAX_CUBES_PER_ROOM x (pos f32x2, vel f32x2)
//! 248 agents           NUM_AGENTS x 48 bytes
//!       pos f32x2, vel f32x2, theta f32, grab i32, progress f32,
//!       reward f32, done i32, max_room i32, key_mask u32,
//!       exited u8 + 3 reserved
//! 344 zero padding to CHECKPOINT_BYTES
//! ```

use crate::consts::{MAX_CUBES_PER_ROOM, NUM_AGENTS, NUM_ROOMS};
use crate::types::{Agent, Cube, CubeRef, Room};
use smallvec::SmallVec;
use std::error::Error;
use std::fmt;
use warren_core::EpisodeId;

/// Magic bytes at the start of every valid blob.
pub const CHECKPOINT_MAGIC: [u8; 4] = *b"WCKP";

/// Blob format version accepted by [`decode`].
pub const CHECKPOINT_VERSION: u16 = 1;

const HEADER_BYTES: usize = 8;
const META_BYTES: usize = 12;
const CUBE_BYTES: usize = 16;
const ROOM_BYTES: usize = 4 + 8 + 4 + 8 + 4 + MAX_CUBES_PER_ROOM * CUBE_BYTES;
const AGENT_BYTES: usize = 48;

/// Bytes actually written by [`encode`]; the rest of the row is zero.
pub const CHECKPOINT_PAYLOAD_BYTES: usize =
    HEADER_BYTES + META_BYTES + NUM_ROOMS * ROOM_BYTES + NUM_AGENTS * AGENT_BYTES;

/// Fixed size of one checkpoint tensor row.
pub const CHECKPOINT_BYTES: usize = 384;

const _: () = assert!(CHECKPOINT_PAYLOAD_BYTES <= CHECKPOINT_BYTES);

/// A decoded snapshot of one world.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    /// Episode id at save time.
    pub episode_id: EpisodeId,
    /// The saved world's reset count, restored so later resets of a
    /// restored world regenerate the same level sequence.
    pub episode_ordinal: u32,
    /// Steps remaining at save time.
    pub steps_remaining: i32,
    /// Full room geometry and dynamic state.
    pub rooms: [Room; NUM_ROOMS],
    /// Full agent state, including last published reward and done.
    pub agents: [Agent; NUM_AGENTS],
}

/// Why a blob was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckpointError {
    /// The blob does not start with [`CHECKPOINT_MAGIC`]. Also the error
    /// for a never-saved (all-zero) row.
    BadMagic,
    /// The blob's format version is not [`CHECKPOINT_VERSION`].
    UnsupportedVersion {
        /// Version field found in the blob.
        found: u16,
    },
    /// The input is shorter than the fixed payload.
    Truncated {
        /// Bytes the payload requires.
        needed: usize,
        /// Bytes actually supplied.
        got: usize,
    },
    /// A count or index field is outside its valid range.
    CountOutOfRange {
        /// Which field was out of range.
        field: &'static str,
        /// The value found.
        value: i64,
        /// The largest valid value.
        max: i64,
    },
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::BadMagic => {
                f.write_str("checkpoint blob does not start with the WCKP magic")
            }
            CheckpointError::UnsupportedVersion { found } => write!(
                f,
                "unsupported checkpoint version {found} (this build reads {CHECKPOINT_VERSION})"
            ),
            CheckpointError::Truncated { needed, got } => {
                write!(f, "checkpoint truncated: need {needed} bytes, got {got}")
            }
            CheckpointError::CountOutOfRange { field, value, max } => {
                write!(f, "checkpoint {field} out of range: {value} (max {max})")
            }
        }
    }
}

impl Error for CheckpointError {}

// ── Encode ──────────────────────────────────────────────────────

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn bytes(&mut self, v: &[u8]) {
        self.buf[self.pos..self.pos + v.len()].copy_from_slice(v);
        self.pos += v.len();
    }

    fn u8(&mut self, v: u8) {
        self.bytes(&[v]);
    }

    fn u16(&mut self, v: u16) {
        self.bytes(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.bytes(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.bytes(&v.to_le_bytes());
    }

    fn vec2(&mut self, v: [f32; 2]) {
        self.f32(v[0]);
        self.f32(v[1]);
    }
}

/// Serialize a snapshot into the first [`CHECKPOINT_BYTES`] of `out`,
/// zeroing the padding tail.
///
/// # Panics
///
/// Panics if `out` is shorter than [`CHECKPOINT_BYTES`]; callers write
/// into checkpoint tensor rows, which have exactly that size.
pub fn encode(cp: &Checkpoint, out: &mut [u8]) {
    assert!(
        out.len() >= CHECKPOINT_BYTES,
        "checkpoint row too short: {} bytes, need {CHECKPOINT_BYTES}",
        out.len()
    );
    out[..CHECKPOINT_BYTES].fill(0);

    let mut w = Writer { buf: out, pos: 0 };
    w.bytes(&CHECKPOINT_MAGIC);
    w.u16(CHECKPOINT_VERSION);
    w.u16(0);
    w.u32(cp.episode_id.0);
    w.u32(cp.episode_ordinal);
    w.i32(cp.steps_remaining);

    for room in &cp.rooms {
        w.f32(room.door_x);
        w.vec2(room.button);
        w.u8(room.key.is_some() as u8);
        w.u8(room.key_taken as u8);
        w.u8(room.door_open as u8);
        w.u8(room.button_pressed as u8);
        w.vec2(room.key.unwrap_or([0.0, 0.0]));
        w.u32(room.cubes.len() as u32);
        for slot in 0..MAX_CUBES_PER_ROOM {
            let cube = room.cubes.get(slot).copied().unwrap_or_default();
            w.vec2(cube.pos);
            w.vec2(cube.vel);
        }
    }

    for agent in &cp.agents {
        w.vec2(agent.pos);
        w.vec2(agent.vel);
        w.f32(agent.theta);
        w.i32(CubeRef::code(agent.grab));
        w.f32(agent.progress);
        w.f32(agent.reward);
        w.i32(agent.done as i32);
        w.i32(agent.max_room);
        w.u32(agent.key_mask);
        w.u8(agent.exited as u8);
        w.pos += 3;
    }

    debug_assert_eq!(w.pos, CHECKPOINT_PAYLOAD_BYTES);
}

// ── Decode ──────────────────────────────────────────────────────

// Infallible by construction: decode() checks the full payload length
// once up front, and every read below stays inside it.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        let v = self.buf[self.pos];
        self.pos += 1;
        v
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.array())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array())
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.array())
    }

    fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.array())
    }

    fn vec2(&mut self) -> [f32; 2] {
        [self.f32(), self.f32()]
    }
}

/// Parse and validate a blob.
///
/// # Errors
///
/// Rejects short input, wrong magic, unknown version, cube counts above
/// [`MAX_CUBES_PER_ROOM`], and grab references that point outside the
/// decoded cube lists. Arbitrary input bytes never panic.
pub fn decode(bytes: &[u8]) -> Result<Checkpoint, CheckpointError> {
    if bytes.len() < CHECKPOINT_PAYLOAD_BYTES {
        return Err(CheckpointError::Truncated {
            needed: CHECKPOINT_PAYLOAD_BYTES,
            got: bytes.len(),
        });
    }

    let mut r = Reader { buf: bytes, pos: 0 };
    if r.array::<4>() != CHECKPOINT_MAGIC {
        return Err(CheckpointError::BadMagic);
    }
    let version = r.u16();
    if version != CHECKPOINT_VERSION {
        return Err(CheckpointError::UnsupportedVersion { found: version });
    }
    r.u16();

    let episode_id = EpisodeId(r.u32());
    let episode_ordinal = r.u32();
    let steps_remaining = r.i32();

    let mut rooms: [Room; NUM_ROOMS] = Default::default();
    for room in rooms.iter_mut() {
        let door_x = r.f32();
        let button = r.vec2();
        let has_key = r.u8() != 0;
        let key_taken = r.u8() != 0;
        let door_open = r.u8() != 0;
        let button_pressed = r.u8() != 0;
        let key_pos = r.vec2();

        let cube_count = r.u32();
        if cube_count as usize > MAX_CUBES_PER_ROOM {
            return Err(CheckpointError::CountOutOfRange {
                field: "cube_count",
                value: i64::from(cube_count),
                max: MAX_CUBES_PER_ROOM as i64,
            });
        }
        let mut cubes: SmallVec<[Cube; MAX_CUBES_PER_ROOM]> = SmallVec::new();
        for slot in 0..MAX_CUBES_PER_ROOM {
            let cube = Cube {
                pos: r.vec2(),
                vel: r.vec2(),
            };
            if slot < cube_count as usize {
                cubes.push(cube);
            }
        }

        *room = Room {
            door_x,
            button,
            key: has_key.then_some(key_pos),
            key_taken,
            door_open,
            button_pressed,
            cubes,
        };
    }

    let mut agents: [Agent; NUM_AGENTS] = Default::default();
    for agent in agents.iter_mut() {
        let pos = r.vec2();
        let vel = r.vec2();
        let theta = r.f32();
        let grab_code = r.i32();
        let grab = CubeRef::from_code(grab_code).map_err(|code| {
            CheckpointError::CountOutOfRange {
                field: "grab_index",
                value: i64::from(code),
                max: (NUM_ROOMS * MAX_CUBES_PER_ROOM) as i64 - 1,
            }
        })?;
        if let Some(held) = grab {
            let count = rooms[held.room].cubes.len();
            if held.slot >= count {
                return Err(CheckpointError::CountOutOfRange {
                    field: "grab_slot",
                    value: held.slot as i64,
                    max: count as i64 - 1,
                });
            }
        }
        let progress = r.f32();
        let reward = r.f32();
        let done = r.i32() != 0;
        let max_room = r.i32();
        let key_mask = r.u32();
        let exited = r.u8() != 0;
        r.pos += 3;

        *agent = Agent {
            pos,
            vel,
            theta,
            grab,
            progress,
            reward,
            done,
            max_room,
            exited,
            key_mask,
        };
    }

    debug_assert_eq!(r.pos, CHECKPOINT_PAYLOAD_BYTES);
    Ok(Checkpoint {
        episode_id,
        episode_ordinal,
        steps_remaining,
        rooms,
        agents,
    })
}
