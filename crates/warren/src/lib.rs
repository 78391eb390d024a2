//! Warren: a batched multi-world escape-room simulator with a
//! train-facing tensor interface.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Warren sub-crates. For most users, adding `warren` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use warren::prelude::*;
//!
//! // Four worlds on the CPU thread-pool backend. Construction resets
//! // every world and runs one tick, so the tensors are already valid.
//! let mut manager = Manager::new(ManagerConfig {
//!     exec: ExecMode::Threaded { num_workers: Some(2) },
//!     num_worlds: 4,
//!     auto_reset: true,
//!     ..ManagerConfig::default()
//! })
//! .unwrap();
//!
//! // Drive every agent forward and advance all worlds in lockstep.
//! for world in 0..4 {
//!     manager.set_action(world, 0, 3, 0, 2, 0);
//!     manager.set_action(world, 1, 3, 0, 2, 0);
//! }
//! let metrics = manager.step();
//! assert_eq!(metrics.worlds_advanced, 4);
//!
//! // Fixed-shape exports, named the way trainers consume them.
//! let ti = manager.train_interface();
//! assert_eq!(ti.observations.keys().next(), Some(&"self"));
//! assert!(ti.rewards.f32().iter().all(|r| r.is_finite()));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `warren-core` | IDs, dtypes, actions, flags, shared counters |
//! | [`assets`] | `warren-assets` | Collision-asset loader and rigid-body table |
//! | [`sim`] | `warren-sim` | Per-world simulation, export schema, checkpoint codec |
//! | [`exec`] | `warren-exec` | Execution backends, device/stream model, tensor views |
//! | [`manager`] | `warren-manager` | `Manager`, train interface, rollout transfer |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// IDs, dtypes, action records, flags, and shared atomic counters
/// (`warren-core`).
pub use warren_core as types;

/// Collision-asset loading and the rigid-body table (`warren-assets`).
pub use warren_assets as assets;

/// Per-world simulation: level generation, movement, observations,
/// rewards, the checkpoint codec, and the export schema (`warren-sim`).
pub use warren_sim as sim;

/// Execution backends and the device/stream model (`warren-exec`).
///
/// [`exec::ThreadedExecutor`] and [`exec::BatchExecutor`] implement the
/// [`exec::Executor`] contract the manager drives.
pub use warren_exec as exec;

/// The manager and train-facing surfaces (`warren-manager`).
pub use warren_manager as manager;

/// Common imports for typical Warren usage.
///
/// ```rust
/// use warren::prelude::*;
/// ```
pub mod prelude {
    // Core records and flags
    pub use warren_core::{Action, EpisodeId, ExecMode, ExportId, RewardMode, SimFlags, TickId};

    // Errors
    pub use warren_assets::AssetError;
    pub use warren_exec::ExecError;
    pub use warren_manager::{ConfigError, ManagerError};
    pub use warren_sim::checkpoint::CheckpointError;

    // Schema and device model
    pub use warren_exec::{
        Affinity, Device, DeviceBuffer, RolloutBuffers, StepMetrics, Stream, Tensor,
    };
    pub use warren_sim::{ExportSchema, SCHEMA_VERSION};

    // Manager
    pub use warren_manager::{Manager, ManagerConfig, TrainInterface};
}
