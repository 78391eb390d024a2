//! The backend contract and the accelerated rollout transfer protocol.

use crate::device::{Device, DeviceBuffer};
use crate::export::Tensor;
use crate::metrics::StepMetrics;
use crate::stream::Stream;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use warren_core::ExportId;
use warren_sim::ExportSchema;

/// Errors surfaced by backend operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecError {
    /// The backend has no device-resident exports to transfer.
    RolloutUnsupported,
    /// A caller buffer lives on a different device than the exports.
    DeviceMismatch {
        /// Slot or buffer being validated.
        what: &'static str,
        /// Device the exports live on.
        expected: u32,
        /// Device the caller's buffer lives on.
        got: u32,
    },
    /// A caller buffer has the wrong element type.
    BufferDtype {
        /// Slot or buffer being validated.
        what: &'static str,
    },
    /// A caller buffer has the wrong element count.
    BufferLen {
        /// Slot or buffer being validated.
        what: &'static str,
        /// Element count the export layout requires.
        expected: usize,
        /// Element count the caller provided.
        got: usize,
    },
    /// The caller provided the wrong number of observation or stat
    /// buffers.
    BufferCount {
        /// Which buffer list was mis-sized.
        what: &'static str,
        /// Buffer count the export layout requires.
        expected: usize,
        /// Buffer count the caller provided.
        got: usize,
    },
    /// The caller asked for policy assignments this simulator does not
    /// export.
    NoPolicyAssignments,
    /// The caller was compiled against a different export layout.
    SchemaVersion {
        /// Version this backend exports.
        expected: u32,
        /// Version the caller expects.
        got: u32,
    },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RolloutUnsupported => {
                write!(f, "this backend does not support accelerated rollout transfer")
            }
            Self::DeviceMismatch {
                what,
                expected,
                got,
            } => write!(
                f,
                "{what}: buffer lives on device {got}, exports live on device {expected}"
            ),
            Self::BufferDtype { what } => write!(f, "{what}: wrong element type"),
            Self::BufferLen {
                what,
                expected,
                got,
            } => write!(f, "{what}: {got} elements, layout requires {expected}"),
            Self::BufferCount {
                what,
                expected,
                got,
            } => write!(f, "{what}: {got} buffers, layout requires {expected}"),
            Self::NoPolicyAssignments => {
                write!(f, "this simulator exports no policy assignments")
            }
            Self::SchemaVersion { expected, got } => write!(
                f,
                "export layout version mismatch: backend exports v{expected}, caller expects v{got}"
            ),
        }
    }
}

impl Error for ExecError {}

/// Caller-owned device buffers for one accelerated rollout step.
///
/// All buffers must live on the backend's device and match the export
/// layout exactly; [`Executor::rollout`] validates every field before
/// enqueueing any work, so a rejected call leaves both the exports and
/// the caller's buffers untouched.
#[derive(Clone, Debug)]
pub struct RolloutBuffers {
    /// Actions to apply this tick, copied into the action export before
    /// the tick runs.
    pub actions: DeviceBuffer,
    /// Per-world reset requests, copied into the reset export before the
    /// tick runs.
    pub resets: DeviceBuffer,
    /// Receives the reward export after the tick.
    pub rewards: DeviceBuffer,
    /// Receives the done export after the tick.
    pub dones: DeviceBuffer,
    /// Receives per-agent policy assignments, if the simulator exports
    /// them. This simulator exports none; `Some` is rejected.
    pub policy_assignments: Option<DeviceBuffer>,
    /// Receive the observation exports after the tick, one buffer per
    /// slot in [`ExportSchema::OBSERVATIONS`] order.
    pub observations: Vec<DeviceBuffer>,
    /// Receive the per-episode stat exports, one buffer per slot in
    /// [`ExportSchema::STATS`] order (empty for this simulator).
    pub stats: Vec<DeviceBuffer>,
    /// Export layout version the caller was built against; must equal
    /// [`warren_sim::SCHEMA_VERSION`].
    pub schema_version: u32,
}

/// A lockstep execution backend driving every world one tick at a time.
///
/// Implementations own the worlds and the exported buffers. `step`
/// returns only after every world has observed the tick barrier, so a
/// caller holding no tensors across `step` always reads a consistent
/// post-tick snapshot.
pub trait Executor: Send {
    /// The export schema this backend was built for.
    fn schema(&self) -> &ExportSchema;

    /// Advance every world exactly one tick and refresh the exports.
    fn step(&mut self) -> StepMetrics;

    /// A view over one export slot. Stable identity: the view always
    /// covers the same backing buffer for the backend's lifetime.
    fn tensor(&self, id: ExportId) -> Tensor<'_>;

    /// Write into an i32 export slot at `offset` elements.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not i32 or the write overruns the buffer.
    fn write_i32(&mut self, id: ExportId, offset: usize, values: &[i32]);

    /// Write into a u8 export slot at `offset` elements.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not u8 or the write overruns the buffer.
    fn write_u8(&mut self, id: ExportId, offset: usize, values: &[u8]);

    /// Metrics from the most recent `step`, or defaults before the
    /// first.
    fn last_metrics(&self) -> &StepMetrics;

    /// The device the exports live on, if any.
    fn device(&self) -> Option<&Arc<Device>> {
        None
    }

    /// Enqueue one full rollout step on `stream`: copy actions and
    /// resets in, tick every world, copy rewards, dones, observations,
    /// and stats out.
    ///
    /// The default implementation rejects the call; only backends with
    /// device-resident exports override it.
    fn rollout(&mut self, buffers: &RolloutBuffers, stream: &Stream) -> Result<(), ExecError> {
        let _ = (buffers, stream);
        Err(ExecError::RolloutUnsupported)
    }
}
