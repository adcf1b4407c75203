//! GPIO wrappers
//!
//! Thin newtypes over embassy-rp pins implementing the `ezfeeder-hal` pin
//! traits, so the board-agnostic stepper and feeder loop can own them.

use embassy_rp::gpio::{Input, Level, Output, Pin, Pull};
use embassy_rp::Peri;

/// Push-pull output (STEP, DIR, ENABLE)
pub struct Rp2040Output<'d> {
    pin: Output<'d>,
}

impl<'d> Rp2040Output<'d> {
    /// Configure a pin as output at the given level
    pub fn new(pin: Peri<'d, impl Pin>, initial_high: bool) -> Self {
        let level = if initial_high { Level::High } else { Level::Low };
        Self {
            pin: Output::new(pin, level),
        }
    }
}

impl ezfeeder_hal::OutputPin for Rp2040Output<'_> {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high()
    }
}

/// Digital input (manual button)
pub struct Rp2040Input<'d> {
    pin: Input<'d>,
}

impl<'d> Rp2040Input<'d> {
    /// Configure a pin as input
    ///
    /// The feeder button is active-high and wired with an external
    /// pull-down, so `Pull::Down` is the usual choice.
    pub fn new(pin: Peri<'d, impl Pin>, pull: Pull) -> Self {
        Self {
            pin: Input::new(pin, pull),
        }
    }
}

impl ezfeeder_hal::InputPin for Rp2040Input<'_> {
    fn is_high(&self) -> bool {
        self.pin.is_high()
    }
}
