//! Stepper motion
//!
//! - [`ramp`]: trapezoidal step interval generator
//! - [`stepdir`]: step/dir/enable GPIO stepper driven by the ramp

pub mod ramp;
pub mod stepdir;

pub use ramp::{RampConfig, StepRamp};
pub use stepdir::StepDirStepper;
