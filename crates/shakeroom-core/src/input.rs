//! Turns raw accelerometer samples into impulse triggers.
//!
//! The engine only consumes impulses; this adapter is what a host puts
//! between its motion sensor and [`EngineHandle::on_impulse`].
//!
//! [`EngineHandle::on_impulse`]: crate::engine::EngineHandle::on_impulse

use serde::{Deserialize, Serialize};

use crate::storage::InputConfig;

/// Standard gravity in m/s².
pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// One accelerometer reading in m/s².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl MotionSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

#[derive(Debug, Clone)]
pub struct ShakeDetector {
    threshold: f32,
}

impl ShakeDetector {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            threshold: config.threshold,
        }
    }

    /// True when the reading deviates from gravity by more than the threshold.
    pub fn is_impulse(&self, sample: MotionSample) -> bool {
        (sample.magnitude() - STANDARD_GRAVITY).abs() > self.threshold
    }
}

impl Default for ShakeDetector {
    fn default() -> Self {
        Self::new(&InputConfig::default())
    }
}
