//! RP2040-specific HAL for the pet feeder firmware
//!
//! This crate provides RP2040 implementations of the shared
//! `ezfeeder-hal` traits:
//!
//! - Flash storage driver (implements `ezfeeder_hal::FlashStorage`)
//! - GPIO output and input wrappers for the motor driver pins and the
//!   manual button

#![no_std]

pub mod flash;
pub mod gpio;

// Re-export shared traits from ezfeeder-hal for convenience
pub use ezfeeder_hal::{FlashStorage as FlashStorageTrait, StorageKey};
