//! Execution backends for the Warren batched simulator.
//!
//! Two interchangeable implementations of the [`Executor`] contract
//! drive every world one synchronized tick at a time:
//!
//! - [`ThreadedExecutor`] keeps exports in host memory and runs worlds
//!   on a pool of scoped threads; the tick barrier is the scope join.
//! - [`BatchExecutor`] keeps exports on a software-modelled [`Device`]
//!   and runs ticks as ops on a [`Stream`]; the tick barrier is a
//!   stream fence. It additionally supports the accelerated rollout
//!   transfer protocol via [`Executor::rollout`].
//!
//! Callers observe the same contract from both: fixed tensor shapes,
//! stable buffer identity, and a fully consistent snapshot after every
//! `step`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod batch;
mod device;
mod executor;
mod export;
mod metrics;
mod stream;
mod threaded;

pub use batch::BatchExecutor;
pub use device::{Device, DeviceBuffer};
pub use executor::{ExecError, Executor, RolloutBuffers};
pub use export::{Affinity, ExportTable, Tensor};
pub use metrics::StepMetrics;
pub use stream::Stream;
pub use threaded::ThreadedExecutor;
