//! Networking
//!
//! - [`wifi`]: CYW43 bring-up and station join
//! - [`ntp`]: SNTP over UDP and the clock built on it
//! - [`firebase`]: HTTPS remote store client

pub mod firebase;
pub mod ntp;
pub mod wifi;

pub use firebase::FirebaseClient;
pub use ntp::{NetClock, UdpNtpTransport};
pub use wifi::join_forever;
