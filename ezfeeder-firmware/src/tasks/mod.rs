//! Embassy async tasks
//!
//! The feeder task owns all application state. The radio and network stack
//! runners only move packets.

pub mod feeder;
pub mod net;

pub use feeder::{feeder_task, FeederApp};
pub use net::{cyw43_task, net_task};
