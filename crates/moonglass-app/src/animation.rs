//! Fixed-timestep spin of the sphere.
//!
//! Decouples the rotation step (fixed 60 Hz) from the paint rate using an
//! accumulator. The leftover fraction of a step is applied when reading the
//! angle so the sphere turns smoothly at any frame rate.

use std::f64::consts::TAU;
use std::time::Instant;

use tracing::warn;

/// Fixed rotation timestep: 60 Hz.
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Longest frame accounted for; anything slower is clamped so a stalled
/// window does not spin the sphere through dozens of steps at once.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Spin state advanced once per painted frame.
pub struct AnimationClock {
    previous_time: Instant,
    accumulator: f64,
    speed: f64,
    angle: f64,
    frame_count: u64,
    update_count: u64,
}

impl AnimationClock {
    /// A clock spinning at `speed_deg` degrees per second, starting now.
    pub fn new(speed_deg: f32) -> Self {
        Self {
            previous_time: Instant::now(),
            accumulator: 0.0,
            speed: f64::from(speed_deg).to_radians(),
            angle: 0.0,
            frame_count: 0,
            update_count: 0,
        }
    }

    pub fn set_speed(&mut self, speed_deg: f32) {
        self.speed = f64::from(speed_deg).to_radians();
    }

    /// Measure the time since the previous tick and advance.
    ///
    /// Returns the rotation angle in radians, wrapped to one turn.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f64();
        self.previous_time = now;
        self.advance(frame_time)
    }

    /// Advance by an explicit frame time in seconds.
    pub fn advance(&mut self, frame_time: f64) -> f32 {
        let frame_time = if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            MAX_FRAME_TIME
        } else {
            frame_time.max(0.0)
        };

        self.accumulator += frame_time;
        while self.accumulator >= FIXED_DT {
            self.angle = (self.angle + self.speed * FIXED_DT).rem_euclid(TAU);
            self.accumulator -= FIXED_DT;
            self.update_count += 1;
        }
        self.frame_count += 1;

        self.interpolated_angle()
    }

    /// Fraction of a step left in the accumulator, in `[0, 1)`.
    pub fn alpha(&self) -> f64 {
        if self.accumulator > 0.0 {
            self.accumulator / FIXED_DT
        } else {
            0.0
        }
    }

    /// Current rotation angle in radians.
    pub fn interpolated_angle(&self) -> f32 {
        (self.angle + self.speed * FIXED_DT * self.alpha()).rem_euclid(TAU) as f32
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}
