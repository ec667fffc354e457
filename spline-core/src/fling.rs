//! Viewport fling
//!
//! [`VelocityTracker`] estimates how fast the pointer was moving when it was
//! released, and [`Fling`] keeps scrolling the viewport at that speed while
//! friction decays it. Both run off the host's event timestamps, so the host
//! only has to call [`Fling::tick`] once per display refresh.

use crate::config::InteractionConfig;
use kurbo::{Point, Vec2};
use std::collections::VecDeque;
use std::time::Duration;

/// Recent pointer positions in view coordinates
///
/// Only samples inside the velocity window are kept.
#[derive(Clone, Debug)]
pub struct VelocityTracker {
    window: Duration,
    samples: VecDeque<(Duration, Point)>,
}

impl VelocityTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn add(&mut self, time: Duration, position: Point) {
        // A timestamp from before the last sample starts a fresh history
        if self.samples.back().is_some_and(|&(last, _)| time < last) {
            self.samples.clear();
        }
        self.samples.push_back((time, position));

        let oldest = time.saturating_sub(self.window);
        while self.samples.front().is_some_and(|&(t, _)| t < oldest) {
            self.samples.pop_front();
        }
    }

    /// Average velocity over the window, in units per second
    ///
    /// Returns zero with fewer than two samples in the window.
    pub fn velocity(&self) -> Vec2 {
        let (Some(&(first_time, first)), Some(&(end_time, end))) =
            (self.samples.front(), self.samples.back())
        else {
            return Vec2::ZERO;
        };

        let dt = end_time.saturating_sub(first_time).as_secs_f64();
        if dt <= 0.0 {
            return Vec2::ZERO;
        }
        (end - first) / dt
    }
}

/// Decelerating viewport motion
#[derive(Clone, Debug)]
pub struct Fling {
    position: Vec2,
    velocity: Vec2,
    last_tick: Duration,
    active: bool,
    limit: f64,
    friction: f64,
    stop_velocity: f64,
}

impl Fling {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            last_tick: Duration::ZERO,
            active: false,
            limit: config.fling_limit,
            friction: config.fling_friction,
            stop_velocity: config.fling_stop_velocity,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start flinging from `start` with `velocity` (units per second)
    ///
    /// Releases slower than the stop velocity do not start a fling.
    pub fn start(&mut self, start: Vec2, velocity: Vec2, now: Duration) {
        self.position = start;
        self.velocity = velocity;
        self.last_tick = now;
        self.active = velocity.hypot() >= self.stop_velocity;
        if self.active {
            log::debug!("fling started at {start:?} with velocity {velocity:?}");
        }
    }

    /// Stop immediately, leaving the viewport where it is
    pub fn abort(&mut self) {
        if self.active {
            log::debug!("fling aborted");
        }
        self.active = false;
        self.velocity = Vec2::ZERO;
    }

    /// Advance to `now`
    ///
    /// Returns the new viewport offset, rounded to whole units, or `None`
    /// once the fling has come to rest.
    pub fn tick(&mut self, now: Duration) -> Option<Vec2> {
        if !self.active {
            return None;
        }

        let dt = now.saturating_sub(self.last_tick).as_secs_f64();
        self.last_tick = now;

        self.position += self.velocity * dt;
        self.velocity *= self.friction.powf(dt * 60.0);

        // Axes that hit the limit stop moving
        if self.position.x.abs() >= self.limit {
            self.position.x = self.position.x.clamp(-self.limit, self.limit);
            self.velocity.x = 0.0;
        }
        if self.position.y.abs() >= self.limit {
            self.position.y = self.position.y.clamp(-self.limit, self.limit);
            self.velocity.y = 0.0;
        }

        if self.velocity.hypot() < self.stop_velocity {
            self.velocity = Vec2::ZERO;
            self.active = false;
            log::debug!("fling stopped at {:?}", self.position);
        }

        Some(Vec2::new(self.position.x.round(), self.position.y.round()))
    }
}
