//! The Warren manager: lockstep orchestration of batched worlds.
//!
//! [`Manager`] constructs one execution backend, brings every world
//! into its first episode, and from then on exposes:
//!
//! - [`Manager::step`] — advance all worlds one synchronized tick;
//! - the per-world flag protocol — [`Manager::trigger_reset`],
//!   [`Manager::set_save_checkpoint`],
//!   [`Manager::trigger_load_checkpoint`];
//! - fixed-shape tensor accessors over the exported buffers;
//! - [`Manager::train_interface`] — the named bundle trainers consume;
//! - [`Manager::rollout_step`] — the accelerated rollout transfer path
//!   for the batched backend.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod manager;
mod train;

pub use config::{ConfigError, ManagerConfig, MAX_WORLDS};
pub use error::ManagerError;
pub use manager::Manager;
pub use train::TrainInterface;
