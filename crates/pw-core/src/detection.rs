//! Walking detection from pedometer and accelerometer samples.
//!
//! Two independent triggers feed the confirmation prompt:
//! - the cumulative step count jumping by at least `step_threshold` between
//!   two consecutive samples
//! - a periodic acceleration sample whose magnitude exceeds
//!   `acceleration_threshold`
//!
//! The detector only measures. Whether a trigger is acted on (no prompt while
//! one is pending or a session is running) is decided by the controller.

/// Thresholds for the walking heuristic.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Minimum step delta between two pedometer samples. Default: 10.
    pub step_threshold: u64,

    /// Acceleration magnitude that must be exceeded. Default: 0.1.
    pub acceleration_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            step_threshold: 10,
            acceleration_threshold: 0.1,
        }
    }
}

/// One accelerometer reading (user acceleration, gravity removed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MotionSample {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.z
            .mul_add(self.z, self.x.mul_add(self.x, self.y * self.y))
            .sqrt()
    }
}

/// Why the detector fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Steps { delta: u64 },
    Motion { magnitude: f64 },
}

/// Stateful part of the heuristic: the last pedometer reading.
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectionConfig,
    last_step_count: u64,
}

impl Detector {
    #[must_use]
    pub const fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            last_step_count: 0,
        }
    }

    /// Forget the previous pedometer reading. The pedometer counts from zero
    /// whenever step updates are (re)started.
    pub const fn reset(&mut self) {
        self.last_step_count = 0;
    }

    pub const fn last_step_count(&self) -> u64 {
        self.last_step_count
    }

    /// Record a cumulative step count and report a trigger if the jump since
    /// the previous sample crosses the threshold.
    ///
    /// A count lower than the previous one (pedometer restart) is treated as
    /// a fresh baseline.
    pub fn observe_steps(&mut self, total: u64) -> Option<Trigger> {
        let delta = total.saturating_sub(self.last_step_count);
        self.last_step_count = total;
        (delta >= self.config.step_threshold).then_some(Trigger::Steps { delta })
    }

    /// Check an acceleration sample against the threshold.
    pub fn observe_motion(&self, sample: MotionSample) -> Option<Trigger> {
        let magnitude = sample.magnitude();
        (magnitude > self.config.acceleration_threshold).then_some(Trigger::Motion { magnitude })
    }
}
