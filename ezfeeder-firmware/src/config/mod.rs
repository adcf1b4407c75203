//! Device settings loading
//!
//! Settings come from a TOML record provisioned to flash, falling back to
//! the `feeder.toml` embedded at build time.

pub mod loader;

pub use loader::{load_settings, LoadError, SettingsPersistence};
