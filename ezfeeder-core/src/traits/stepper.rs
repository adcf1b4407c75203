//! Stepper motor driver trait
//!
//! The feeder only needs relative moves that complete before returning and
//! an output stage that can be released between feedings.

/// Motor rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Positive step count
    Forward,
    /// Negative step count
    Reverse,
}

impl Direction {
    /// Direction of a signed relative move
    pub fn of(steps: i32) -> Self {
        if steps < 0 {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }
}

/// Errors that can occur with stepper operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperError {
    /// Pin or bus access to the driver failed
    CommunicationError,
    /// Move requested while the output stage is disabled
    NotEnabled,
    /// Invalid configuration
    InvalidConfig,
}

/// Trait for stepper motor drivers
///
/// Implementations own the step generation. `move_by` resolves once the
/// motor has reached the target position.
pub trait StepperDriver {
    /// Energize the driver output stage
    fn enable_outputs(&mut self) -> Result<(), StepperError>;

    /// Release the driver output stage
    ///
    /// When disabled, the motor is free to rotate and does not hold position.
    fn disable_outputs(&mut self) -> Result<(), StepperError>;

    /// Check if the output stage is energized
    fn is_enabled(&self) -> bool;

    /// Move by a signed number of steps and wait for arrival
    fn move_by(
        &mut self,
        steps: i32,
    ) -> impl core::future::Future<Output = Result<(), StepperError>>;

    /// Current position in steps since power-up
    fn position(&self) -> i64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_of() {
        assert_eq!(Direction::of(-3200), Direction::Reverse);
        assert_eq!(Direction::of(600), Direction::Forward);
        assert_eq!(Direction::of(0), Direction::Forward);
    }
}
