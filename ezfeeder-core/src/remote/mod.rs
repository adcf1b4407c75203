//! Remote store abstraction
//!
//! The remote database holds the user-configured portion size and schedule
//! and receives one timestamp per feeding. Only three request shapes are
//! needed: typed integer get, typed string get and timestamp push.

pub mod firebase;

use core::fmt::Write;

use heapless::String;

use crate::config::{Slot, TimeString};

/// Maximum length of a remote path
pub const MAX_PATH_LEN: usize = 96;

/// Maximum length of an error reason
pub const MAX_REASON_LEN: usize = 64;

/// Remote path such as `/users/<user>/horario1`
pub type RemotePath = String<MAX_PATH_LEN>;

/// Human-readable error reason reported by the remote side
pub type Reason = String<MAX_REASON_LEN>;

/// JSON value type found at a remote path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValueKind {
    Int,
    Float,
    Bool,
    String,
    Null,
    Object,
}

/// Remote store errors
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemoteError {
    /// Could not connect or the connection dropped
    Connection,
    /// Request was not answered in time
    Timeout,
    /// Non-success HTTP status with the reason from the body
    Http { status: u16, reason: Reason },
    /// Value at the path has a different type than requested
    TypeMismatch { expected: ValueKind, found: ValueKind },
    /// String value does not fit the local buffer
    ValueTooLong,
    /// Response body could not be decoded
    Malformed,
    /// Request URL or path does not fit its buffer
    RequestTooLong,
}

impl RemoteError {
    /// Short reason for diagnostics
    pub fn reason(&self) -> &str {
        match self {
            RemoteError::Connection => "connection lost",
            RemoteError::Timeout => "response timed out",
            RemoteError::Http { reason, .. } => reason.as_str(),
            RemoteError::TypeMismatch { .. } => "data type mismatch",
            RemoteError::ValueTooLong => "value too long",
            RemoteError::Malformed => "malformed response",
            RemoteError::RequestTooLong => "request too long",
        }
    }
}

/// Access to the remote database
pub trait RemoteStore {
    /// Read an integer value
    fn get_int(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<i64, RemoteError>>;

    /// Read a string value
    fn get_string(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<TimeString, RemoteError>>;

    /// Append the server timestamp to the collection at `path`
    fn push_timestamp(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<(), RemoteError>>;
}

/// Fixed per-user remote paths
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemotePaths {
    /// Integer portion quantity (`/users/<user>/qtdRacao`)
    pub portions: RemotePath,
    /// Schedule strings (`/users/<user>/horario1..3`)
    pub slots: [RemotePath; 3],
    /// Feeding log collection (`/logs/<user>`)
    pub log: RemotePath,
}

impl RemotePaths {
    /// Build the paths for a user id
    pub fn for_user(user: &str) -> Result<Self, RemoteError> {
        Ok(Self {
            portions: user_path(user, "qtdRacao")?,
            slots: [
                user_path(user, "horario1")?,
                user_path(user, "horario2")?,
                user_path(user, "horario3")?,
            ],
            log: {
                let mut path = RemotePath::new();
                write!(path, "/logs/{}", user).map_err(|_| RemoteError::RequestTooLong)?;
                path
            },
        })
    }

    /// Path of a schedule slot
    pub fn slot(&self, slot: Slot) -> &str {
        self.slots[slot.index()].as_str()
    }
}

fn user_path(user: &str, field: &str) -> Result<RemotePath, RemoteError> {
    let mut path = RemotePath::new();
    write!(path, "/users/{}/{}", user, field).map_err(|_| RemoteError::RequestTooLong)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_for_user() {
        let paths = RemotePaths::for_user("u-42").unwrap();
        assert_eq!(paths.portions.as_str(), "/users/u-42/qtdRacao");
        assert_eq!(paths.slot(Slot::First), "/users/u-42/horario1");
        assert_eq!(paths.slot(Slot::Second), "/users/u-42/horario2");
        assert_eq!(paths.slot(Slot::Third), "/users/u-42/horario3");
        assert_eq!(paths.log.as_str(), "/logs/u-42");
    }

    #[test]
    fn test_paths_too_long() {
        let mut user: String<90> = String::new();
        for _ in 0..90 {
            let _ = user.push('x');
        }
        assert_eq!(
            RemotePaths::for_user(user.as_str()),
            Err(RemoteError::RequestTooLong)
        );
    }

    #[test]
    fn test_reason() {
        let mut reason = Reason::new();
        let _ = reason.push_str("Permission denied");
        let err = RemoteError::Http {
            status: 401,
            reason,
        };
        assert_eq!(err.reason(), "Permission denied");
        assert_eq!(
            RemoteError::TypeMismatch {
                expected: ValueKind::Int,
                found: ValueKind::String
            }
            .reason(),
            "data type mismatch"
        );
    }
}
