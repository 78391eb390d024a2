//! Core vocabulary for the Warren batched simulator.
//!
//! Defines the types every other crate speaks: export slot identifiers
//! ([`ExportId`]), the discrete agent [`Action`] record, simulation
//! feature flags and mode selectors, tensor [`Dtype`]/[`Shape`], and the
//! two pieces of state shared by all worlds of one manager — the
//! [`EpisodeCounter`] and the [`ProgressMeter`].
//!
//! # Design
//!
//! This crate is a leaf: no simulation logic, no I/O, no threads beyond
//! the atomics in [`shared`]. Anything two of the higher crates both need
//! lives here; anything only one needs does not.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod action;
pub mod dtype;
pub mod flags;
pub mod id;
pub mod shared;

pub use action::{
    Action, ACTION_COMPONENTS, MOVE_AMOUNT_BUCKETS, MOVE_ANGLE_BUCKETS, ROTATE_BUCKETS,
};
pub use dtype::{elem_count, Dtype, Shape};
pub use flags::{ExecMode, RewardMode, SimFlags};
pub use id::{EpisodeId, ExportId, TickId};
pub use shared::{EpisodeCounter, ProgressMeter};
