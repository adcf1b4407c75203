//! Board-agnostic core logic for the pet feeder firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Feed configuration record and its flash persistence
//! - Remote store abstraction and the Firebase REST codec
//! - Remote-to-flash configuration sync
//! - Feed controller (dispense pattern) and motion ramp
//! - NTP codec and wall clock
//! - Device settings types and TOML parser
//! - The main-loop tick

#![no_std]
#![deny(unsafe_code)]

pub mod app;
pub mod config;
pub mod feeder;
pub mod motion;
pub mod remote;
pub mod store;
pub mod sync;
pub mod time;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;
