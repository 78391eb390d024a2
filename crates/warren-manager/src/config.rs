//! Manager configuration and validation.
//!
//! [`ManagerConfig`] is the single construction input for
//! [`Manager::new`](crate::Manager::new). [`validate()`](ManagerConfig::validate)
//! checks structural invariants up front; an invalid config is a fatal
//! construction error, never a degraded run.

use std::error::Error;
use std::fmt;
use warren_core::{ExecMode, RewardMode, SimFlags};
use warren_sim::consts::WORLD_WIDTH;

/// Upper bound on the world count. Keeps every export allocation well
/// inside `usize` on 32-bit hosts and catches sign-flipped inputs.
pub const MAX_WORLDS: u32 = 1 << 20;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`ManagerConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `num_worlds` is zero.
    NoWorlds,
    /// `num_worlds` exceeds [`MAX_WORLDS`].
    TooManyWorlds {
        /// The configured world count.
        configured: u32,
    },
    /// `button_width` is non-finite, non-positive, or wider than a room.
    InvalidButtonWidth {
        /// The invalid value.
        value: f32,
    },
    /// `door_width` is non-finite, non-positive, or wider than a room.
    InvalidDoorWidth {
        /// The invalid value.
        value: f32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWorlds => f.write_str("num_worlds must be at least 1"),
            Self::TooManyWorlds { configured } => {
                write!(f, "num_worlds ({configured}) exceeds the maximum of {MAX_WORLDS}")
            }
            Self::InvalidButtonWidth { value } => write!(
                f,
                "button_width must be finite, positive, and at most {WORLD_WIDTH}, got {value}"
            ),
            Self::InvalidDoorWidth { value } => write!(
                f,
                "door_width must be finite, positive, and at most {WORLD_WIDTH}, got {value}"
            ),
        }
    }
}

impl Error for ConfigError {}

// ── ManagerConfig ──────────────────────────────────────────────────

/// Everything a [`Manager`](crate::Manager) needs at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManagerConfig {
    /// Which execution backend to construct.
    pub exec: ExecMode,
    /// Number of worlds advanced in lockstep.
    pub num_worlds: u32,
    /// Reset a done world by itself on its next tick.
    pub auto_reset: bool,
    /// Simulation feature flags.
    pub sim_flags: SimFlags,
    /// Reward shaping.
    pub reward_mode: RewardMode,
    /// Side length of the pressure plates.
    pub button_width: f32,
    /// Width of the door gaps.
    pub door_width: f32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            exec: ExecMode::Threaded { num_workers: None },
            num_worlds: 1,
            auto_reset: false,
            sim_flags: SimFlags::DEFAULT,
            reward_mode: RewardMode::Dense,
            button_width: 1.3,
            door_width: 8.0,
        }
    }
}

impl ManagerConfig {
    /// Check all structural invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated check as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. At least one world.
        if self.num_worlds == 0 {
            return Err(ConfigError::NoWorlds);
        }
        // 2. World count within the allocation bound.
        if self.num_worlds > MAX_WORLDS {
            return Err(ConfigError::TooManyWorlds {
                configured: self.num_worlds,
            });
        }
        // 3. Button plates must fit inside a room.
        let b = self.button_width;
        if !b.is_finite() || b <= 0.0 || b > WORLD_WIDTH {
            return Err(ConfigError::InvalidButtonWidth { value: b });
        }
        // 4. Door gaps must fit inside the separating wall.
        let d = self.door_width;
        if !d.is_finite() || d <= 0.0 || d > WORLD_WIDTH {
            return Err(ConfigError::InvalidDoorWidth { value: d });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ManagerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_worlds_is_rejected() {
        let cfg = ManagerConfig {
            num_worlds: 0,
            ..ManagerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoWorlds));
    }

    #[test]
    fn world_count_is_bounded() {
        let cfg = ManagerConfig {
            num_worlds: MAX_WORLDS + 1,
            ..ManagerConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TooManyWorlds {
                configured: MAX_WORLDS + 1
            })
        );
    }

    #[test]
    fn geometry_widths_are_checked() {
        for bad in [f32::NAN, f32::INFINITY, 0.0, -1.0, WORLD_WIDTH + 0.1] {
            let cfg = ManagerConfig {
                button_width: bad,
                ..ManagerConfig::default()
            };
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidButtonWidth { .. })
            ));
            let cfg = ManagerConfig {
                door_width: bad,
                ..ManagerConfig::default()
            };
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidDoorWidth { .. })
            ));
        }
    }

    #[test]
    fn errors_render_the_offending_value() {
        let msg = ConfigError::InvalidDoorWidth { value: -2.0 }.to_string();
        assert!(msg.contains("-2"));
        let msg = ConfigError::TooManyWorlds {
            configured: MAX_WORLDS + 5,
        }
        .to_string();
        assert!(msg.contains(&MAX_WORLDS.to_string()));
    }
}
