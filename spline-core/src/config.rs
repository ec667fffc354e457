//! Interaction tuning
//!
//! Distances are in density-independent units and are multiplied by
//! `density` before use, the way a host converts dp to pixels.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning for the pointer state machine and viewport fling
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Distance from a control point that still grabs it
    pub touch_radius: f64,

    /// Movement allowed before a press turns into a drag
    pub touch_slop: f64,

    /// Presses held this long without dragging return to the idle state
    pub long_press_timeout_ms: u64,

    /// Fling never scrolls the viewport past +/- this offset
    pub fling_limit: f64,

    /// Velocity kept per 60 Hz frame while flinging (0 stops at once, 1 never slows)
    pub fling_friction: f64,

    /// Fling stops once its speed drops below this, in units per second
    pub fling_stop_velocity: f64,

    /// Pointer history used to estimate release velocity
    pub velocity_window_ms: u64,

    /// Display density multiplier
    pub density: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            touch_radius: 24.0,
            touch_slop: 8.0,
            long_press_timeout_ms: 500,
            fling_limit: 10_000.0,
            fling_friction: 0.95,
            fling_stop_velocity: 20.0,
            velocity_window_ms: 100,
            density: 1.0,
        }
    }
}

impl InteractionConfig {
    pub fn touch_radius_px(&self) -> f64 {
        self.touch_radius * self.density
    }

    pub fn touch_slop_px(&self) -> f64 {
        self.touch_slop * self.density
    }

    pub fn long_press_timeout(&self) -> Duration {
        Duration::from_millis(self.long_press_timeout_ms)
    }

    pub fn velocity_window(&self) -> Duration {
        Duration::from_millis(self.velocity_window_ms)
    }
}
