//! Step/dir stepper driver
//!
//! Drives a STEP/DIR/ENABLE driver board (A4988, DRV8825 and similar) from
//! plain output pins. Step timing comes from the trapezoidal ramp and an
//! async delay, so a move completes before `move_by` resolves.

use embedded_hal_async::delay::DelayNs;
use ezfeeder_hal::OutputPin;

use super::ramp::RampConfig;
use crate::traits::{Direction, StepperDriver, StepperError};

/// STEP pulse high time in microseconds
pub const STEP_PULSE_US: u32 = 2;

/// Delay between a DIR change and the first step in microseconds
pub const DIR_SETUP_US: u32 = 5;

/// Stepper driven by STEP, DIR and an active-low ENABLE pin
pub struct StepDirStepper<STEP, DIR, EN, D> {
    step: STEP,
    dir: DIR,
    enable: EN,
    delay: D,
    ramp: RampConfig,
    enabled: bool,
    position: i64,
}

impl<STEP, DIR, EN, D> StepDirStepper<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    /// Create a driver with the output stage released
    pub fn new(mut step: STEP, mut dir: DIR, mut enable: EN, delay: D, ramp: RampConfig) -> Self {
        step.set_low();
        dir.set_low();
        // Active low: high = disabled
        enable.set_high();

        Self {
            step,
            dir,
            enable,
            delay,
            ramp,
            enabled: false,
            position: 0,
        }
    }

    /// Give the pins and delay back
    pub fn release(self) -> (STEP, DIR, EN, D) {
        (self.step, self.dir, self.enable, self.delay)
    }
}

impl<STEP, DIR, EN, D> StepperDriver for StepDirStepper<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    fn enable_outputs(&mut self) -> Result<(), StepperError> {
        self.enable.set_low();
        self.enabled = true;
        Ok(())
    }

    fn disable_outputs(&mut self) -> Result<(), StepperError> {
        self.enable.set_high();
        self.enabled = false;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn move_by(&mut self, steps: i32) -> Result<(), StepperError> {
        if !self.enabled {
            return Err(StepperError::NotEnabled);
        }
        if steps == 0 {
            return Ok(());
        }

        let direction = Direction::of(steps);
        self.dir.set_state(direction == Direction::Forward);
        self.delay.delay_us(DIR_SETUP_US).await;

        let delta: i64 = match direction {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        };

        for interval_us in self.ramp.ramp(steps.unsigned_abs()) {
            self.step.set_high();
            self.delay.delay_us(STEP_PULSE_US).await;
            self.step.set_low();
            self.delay
                .delay_us(interval_us.saturating_sub(STEP_PULSE_US))
                .await;
            self.position += delta;
        }

        Ok(())
    }

    fn position(&self) -> i64 {
        self.position
    }
}
