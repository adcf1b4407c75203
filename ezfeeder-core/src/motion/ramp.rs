//! Trapezoidal step ramp
//!
//! Produces the delay before each step of a relative move. Speed rises with
//! constant acceleration, holds at the cruise speed and falls again so the
//! motor stops on the last step:
//!
//! ```text
//! v(k) = min(v_max, sqrt(2 * a * (n + 1)))    n = min(k, total - 1 - k)
//! ```
//!
//! Short moves never reach cruise speed and ramp straight down again.

use micromath::F32Ext;

use crate::config::MotorSettings;
use crate::traits::StepperError;

const MICROS_PER_SECOND: f32 = 1_000_000.0;

/// Ramp parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RampConfig {
    /// Cruise speed in steps per second
    pub max_speed: u32,
    /// Acceleration in steps per second squared
    pub acceleration: u32,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            max_speed: 700,
            acceleration: 15_000,
        }
    }
}

impl RampConfig {
    /// Build from motor settings
    pub fn from_settings(settings: &MotorSettings) -> Result<Self, StepperError> {
        let config = Self {
            max_speed: settings.max_speed,
            acceleration: settings.acceleration,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject zero speed or acceleration
    pub fn validate(&self) -> Result<(), StepperError> {
        if self.max_speed == 0 || self.acceleration == 0 {
            return Err(StepperError::InvalidConfig);
        }
        Ok(())
    }

    /// Step interval at cruise speed in microseconds
    pub fn cruise_interval_us(&self) -> u32 {
        (MICROS_PER_SECOND / self.max_speed as f32) as u32
    }

    /// Step intervals for a move of `total` steps
    pub fn ramp(&self, total: u32) -> StepRamp {
        StepRamp {
            config: *self,
            total,
            index: 0,
        }
    }

    fn interval_us(&self, steps_from_rest: u32) -> u32 {
        let ramp_speed = (2.0 * self.acceleration as f32 * (steps_from_rest + 1) as f32).sqrt();
        let speed = ramp_speed.min(self.max_speed as f32);
        (MICROS_PER_SECOND / speed) as u32
    }
}

/// Iterator over per-step intervals in microseconds
#[derive(Debug, Clone)]
pub struct StepRamp {
    config: RampConfig,
    total: u32,
    index: u32,
}

impl Iterator for StepRamp {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.index >= self.total {
            return None;
        }
        let k = self.index;
        self.index += 1;

        let from_rest = k.min(self.total - 1 - k);
        Some(self.config.interval_us(from_rest))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for StepRamp {}
