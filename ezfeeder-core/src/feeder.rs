//! Feed controller
//!
//! One feeding: energize the motor, run the dispense pattern once per
//! portion, release the motor and append a timestamp to the remote log.
//!
//! Each pattern moves back and forth so the auger shakes the food loose
//! instead of packing it:
//!
//! ```text
//! -3200 | settle | +600 | settle | -3200 | settle | +600 | settle
//! ```

use embedded_hal_async::delay::DelayNs;

use crate::remote::{RemoteError, RemoteStore};
use crate::traits::{StepperDriver, StepperError};

/// Relative moves per portion, in steps
pub const DISPENSE_PATTERN: [i32; 4] = [-3200, 600, -3200, 600];

/// Pause after every move in milliseconds
pub const SETTLE_MS: u32 = 200;

/// Outcome of one feeding
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedReport {
    /// Portions requested
    pub portions: u16,
    /// Moves completed
    pub moves: u32,
    /// First motor error, if any; remaining moves were skipped
    pub motion: Result<(), StepperError>,
    /// Remote log append result
    pub log: Result<(), RemoteError>,
}

impl FeedReport {
    /// Whether every requested move completed
    pub fn is_complete(&self) -> bool {
        self.motion.is_ok() && self.moves == self.portions as u32 * DISPENSE_PATTERN.len() as u32
    }
}

/// Drives the motor through the dispense pattern
pub struct FeedController<M, D> {
    motor: M,
    delay: D,
}

impl<M: StepperDriver, D: DelayNs> FeedController<M, D> {
    pub fn new(motor: M, delay: D) -> Self {
        Self { motor, delay }
    }

    /// Access the motor
    pub fn motor(&self) -> &M {
        &self.motor
    }

    /// Give the motor and delay back
    pub fn into_parts(self) -> (M, D) {
        (self.motor, self.delay)
    }

    /// Dispense `portions` and log the feeding
    ///
    /// The motor is released and the log entry is attempted even when a
    /// move fails or `portions` is zero.
    pub async fn feed<R: RemoteStore>(
        &mut self,
        portions: u16,
        remote: &mut R,
        log_path: &str,
    ) -> FeedReport {
        let mut moves = 0;
        let dispensed = self.dispense(portions, &mut moves).await;
        let released = self.motor.disable_outputs();

        let log = remote.push_timestamp(log_path).await;

        FeedReport {
            portions,
            moves,
            motion: dispensed.and(released),
            log,
        }
    }

    async fn dispense(&mut self, portions: u16, moves: &mut u32) -> Result<(), StepperError> {
        self.motor.enable_outputs()?;

        for _ in 0..portions {
            for steps in DISPENSE_PATTERN {
                self.motor.move_by(steps).await?;
                *moves += 1;
                self.delay.delay_ms(SETTLE_MS).await;
            }
        }

        Ok(())
    }
}
