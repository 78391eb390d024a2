//! Construction-time behavior selectors: feature flags, reward mode,
//! execution mode.

use std::fmt;
use std::ops::BitOr;

/// Simulation feature flags, fixed at construction for all worlds.
///
/// A small hand-rolled bit set; flags combine with `|`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SimFlags(u32);

impl SimFlags {
    /// No flags set.
    pub const DEFAULT: SimFlags = SimFlags(0);
    /// Level generation ignores the episode id and always produces the
    /// same fixed layout. Useful for evaluation and debugging.
    pub const USE_FIXED_WORLD: SimFlags = SimFlags(1 << 0);
    /// Steps-remaining never decrements; episodes only end on level exit.
    pub const IGNORE_EPISODE_LENGTH: SimFlags = SimFlags(1 << 1);

    /// Whether every flag in `other` is set in `self`.
    pub fn contains(self, other: SimFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bit representation.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Rebuild from raw bits. Unknown bits are preserved but have no
    /// effect.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl BitOr for SimFlags {
    type Output = SimFlags;

    fn bitor(self, rhs: SimFlags) -> SimFlags {
        SimFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for SimFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("default");
        }
        let mut first = true;
        let mut write = |name: &str, f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if !first {
                f.write_str("|")?;
            }
            first = false;
            f.write_str(name)
        };
        if self.contains(Self::USE_FIXED_WORLD) {
            write("use_fixed_world", f)?;
        }
        if self.contains(Self::IGNORE_EPISODE_LENGTH) {
            write("ignore_episode_length", f)?;
        }
        Ok(())
    }
}

/// Selects how per-agent rewards are shaped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RewardMode {
    /// Reward proportional to forward-progress gained each tick, minus a
    /// per-step slack penalty.
    #[default]
    Dense,
    /// Reward only on first entry into each new room and on level exit,
    /// minus a per-step slack penalty.
    Sparse,
}

impl fmt::Display for RewardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardMode::Dense => f.write_str("dense"),
            RewardMode::Sparse => f.write_str("sparse"),
        }
    }
}

/// Selects the execution backend, once, at construction.
///
/// Both variants are always compiled in; the choice is runtime state, so
/// one binary can drive either backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    /// CPU thread-pool backend. `num_workers = None` picks a worker count
    /// from available parallelism.
    Threaded {
        /// Fixed worker count, or `None` to auto-select.
        num_workers: Option<usize>,
    },
    /// Batched device backend with stream-ordered asynchronous copies.
    Batched {
        /// Index of the device to place worlds and exports on.
        device_index: u32,
    },
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecMode::Threaded { num_workers: None } => f.write_str("threaded(auto)"),
            ExecMode::Threaded {
                num_workers: Some(n),
            } => write!(f, "threaded({n})"),
            ExecMode::Batched { device_index } => write!(f, "batched(device {device_index})"),
        }
    }
}
