//! The discrete per-agent action record.
//!
//! An action is four small integer buckets written by the trainer into the
//! action tensor. Records are level-state, not events: a record keeps
//! applying on every tick until the trainer overwrites it. Decoding clamps
//! each component into its bucket range, so arbitrary integers written
//! through the tensor still produce defined behavior.

use std::f32::consts::PI;

/// Number of i32 components in one action record (the action tensor's
/// innermost dimension).
pub const ACTION_COMPONENTS: usize = 4;

/// Number of movement-strength buckets (`0..MOVE_AMOUNT_BUCKETS`).
pub const MOVE_AMOUNT_BUCKETS: i32 = 4;

/// Number of movement-direction buckets (`0..MOVE_ANGLE_BUCKETS`),
/// 45-degree steps relative to the agent's facing.
pub const MOVE_ANGLE_BUCKETS: i32 = 8;

/// Number of turn buckets (`0..ROTATE_BUCKETS`); the center bucket is
/// "no turn".
pub const ROTATE_BUCKETS: i32 = 5;

/// One agent's discrete action for a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Action {
    /// Movement strength bucket, `0` (stop) to `3` (full speed).
    pub move_amount: i32,
    /// Movement direction bucket, `0..8`, each 45 degrees, `0` = forward.
    pub move_angle: i32,
    /// Turn bucket, `0..5`; `2` = no turn, lower = clockwise, higher =
    /// counter-clockwise.
    pub rotate: i32,
    /// Interaction: `0` = none, `1` = toggle grab.
    pub interact: i32,
}

impl Default for Action {
    /// The neutral action: no movement, no turn, no interaction.
    fn default() -> Self {
        Self {
            move_amount: 0,
            move_angle: 0,
            rotate: ROTATE_BUCKETS / 2,
            interact: 0,
        }
    }
}

impl Action {
    /// Movement strength as a fraction in `[0, 1]`.
    pub fn move_fraction(&self) -> f32 {
        let bucket = self.move_amount.clamp(0, MOVE_AMOUNT_BUCKETS - 1);
        bucket as f32 / (MOVE_AMOUNT_BUCKETS - 1) as f32
    }

    /// Movement direction in radians relative to the agent's facing,
    /// counter-clockwise, `0` = straight ahead.
    pub fn move_direction(&self) -> f32 {
        let bucket = self.move_angle.rem_euclid(MOVE_ANGLE_BUCKETS);
        bucket as f32 * (2.0 * PI / MOVE_ANGLE_BUCKETS as f32)
    }

    /// Turn strength as a signed fraction in `[-1, 1]`; positive is
    /// counter-clockwise.
    pub fn turn_fraction(&self) -> f32 {
        let center = ROTATE_BUCKETS / 2;
        let bucket = self.rotate.clamp(0, ROTATE_BUCKETS - 1);
        (bucket - center) as f32 / center as f32
    }

    /// Whether this record requests a grab/release toggle.
    pub fn wants_grab_toggle(&self) -> bool {
        self.interact == 1
    }

    /// The record as the four i32 lanes of the action tensor.
    pub fn to_lanes(self) -> [i32; ACTION_COMPONENTS] {
        [self.move_amount, self.move_angle, self.rotate, self.interact]
    }

    /// Rebuild a record from four tensor lanes.
    pub fn from_lanes(lanes: [i32; ACTION_COMPONENTS]) -> Self {
        Self {
            move_amount: lanes[0],
            move_angle: lanes[1],
            rotate: lanes[2],
            interact: lanes[3],
        }
    }
}
