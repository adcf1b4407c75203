//! Configuration types
//!
//! - [`types`]: the feed schedule record mirrored from the remote store
//! - [`device`]: device settings (network, clock, motor)
//! - [`toml`]: settings file parser

pub mod device;
pub mod toml;
pub mod types;

pub use device::*;
pub use toml::{parse_settings, ParseError};
pub use types::*;
