//! Per-world escape-room simulation for Warren.
//!
//! Owns everything that happens inside one world: procedural level
//! generation, agent movement and cube pushing, pressure plates, doors
//! and keys, reward shaping, and the checkpoint codec. The execution
//! backends in `warren-exec` drive many [`World`]s against slices of the
//! shared export storage; this crate never allocates or schedules.
//!
//! # Architecture
//!
//! - [`World`] is the state machine; [`World::tick`] consumes one
//!   world's flag cells and republishes its exported rows
//! - [`WorldLanes`] is the borrowed view of those rows a backend carves
//!   out of its export storage
//! - [`ExportSchema`] declares the dtype and shape of every exported
//!   tensor, in the canonical slot order
//! - [`checkpoint`] serializes full world state into the fixed-size
//!   per-world blob row
//!
//! Stepping never draws randomness; only [`level::generate`] consumes
//! the per-episode ChaCha8 stream, so identical construction parameters
//! and flag/action histories replay identical tensors.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod checkpoint;
pub mod consts;
mod init;
pub mod lanes;
pub mod level;
mod obs;
mod schema;
mod types;
mod world;

pub use init::{ViewerBridge, WorldInit};
pub use lanes::{LaneBuffer, WorldLanes};
pub use schema::{ExportSchema, SCHEMA_VERSION};
pub use types::{Agent, Cube, CubeRef, EntityKind, Room};
pub use world::{TickEvents, World, WorldParams};
