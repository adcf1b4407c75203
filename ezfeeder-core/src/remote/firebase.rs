//! Firebase Realtime Database REST codec
//!
//! Transport-free half of the remote store client: request URLs, request
//! bodies and response decoding. The firmware pairs it with an HTTPS client.
//!
//! - `GET https://<host><path>.json?auth=<secret>` answers with a bare JSON
//!   value (`150`, `"08:00:00"`, `null`, ...)
//! - `POST https://<host><path>.json?auth=<secret>` with
//!   `{".sv":"timestamp"}` appends the server time under a generated key
//!   and answers `{"name":"<key>"}`
//! - failures answer a non-2xx status with `{"error":"<reason>"}`

use core::fmt::Write;
use core::str;

use heapless::String;
use serde::Deserialize;

use super::{Reason, RemoteError, ValueKind, MAX_REASON_LEN};
use crate::config::{TimeString, MAX_TIME_LEN};

/// Maximum request URL length
pub const MAX_URL_LEN: usize = 256;

/// Maximum generated push key length
pub const MAX_PUSH_ID_LEN: usize = 32;

/// Request body that makes the server store its own timestamp
pub const TIMESTAMP_BODY: &[u8] = br#"{".sv":"timestamp"}"#;

/// Request URL
pub type Url = String<MAX_URL_LEN>;

/// Key generated by the server for a pushed entry
pub type PushId = String<MAX_PUSH_ID_LEN>;

/// Decoded JSON value from a GET response
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(TimeString),
    Null,
    Object,
}

impl Value {
    /// Type of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Str(_) => ValueKind::String,
            Value::Null => ValueKind::Null,
            Value::Object => ValueKind::Object,
        }
    }

    /// Unwrap an integer or report a type mismatch
    pub fn into_int(self) -> Result<i64, RemoteError> {
        match self {
            Value::Int(n) => Ok(n),
            other => Err(RemoteError::TypeMismatch {
                expected: ValueKind::Int,
                found: other.kind(),
            }),
        }
    }

    /// Unwrap a string or report a type mismatch
    pub fn into_string(self) -> Result<TimeString, RemoteError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(RemoteError::TypeMismatch {
                expected: ValueKind::String,
                found: other.kind(),
            }),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Deserialize)]
struct PushResponse<'a> {
    name: &'a str,
}

/// Build the REST URL for a database path
pub fn url(host: &str, path: &str, auth: &str) -> Result<Url, RemoteError> {
    let mut url = Url::new();
    write!(url, "https://{}{}.json", host, path).map_err(|_| RemoteError::RequestTooLong)?;
    if !auth.is_empty() {
        write!(url, "?auth={}", auth).map_err(|_| RemoteError::RequestTooLong)?;
    }
    Ok(url)
}

/// Map a response status to success or an error carrying the body's reason
pub fn check_status(status: u16, body: &[u8]) -> Result<(), RemoteError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(RemoteError::Http {
            status,
            reason: error_reason(body),
        })
    }
}

/// Extract the reason from an error body
///
/// Falls back to the (truncated) raw body when it is not the usual
/// `{"error": ...}` object.
pub fn error_reason(body: &[u8]) -> Reason {
    let mut reason = Reason::new();

    if let Ok((parsed, _)) = serde_json_core::from_slice::<ErrorBody>(body) {
        push_truncated(&mut reason, parsed.error);
        return reason;
    }

    match str::from_utf8(body) {
        Ok(text) if !text.trim().is_empty() => push_truncated(&mut reason, text.trim()),
        _ => push_truncated(&mut reason, "request failed"),
    }
    reason
}

/// Decode the bare JSON value of a GET response
pub fn parse_value(body: &[u8]) -> Result<Value, RemoteError> {
    let text = str::from_utf8(body)
        .map_err(|_| RemoteError::Malformed)?
        .trim();

    match text.as_bytes().first() {
        None => Err(RemoteError::Malformed),
        Some(b'"') => parse_string_value(text),
        Some(b'{') | Some(b'[') => Ok(Value::Object),
        Some(_) => match text {
            "null" => Ok(Value::Null),
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => {
                if let Ok(n) = text.parse::<i64>() {
                    Ok(Value::Int(n))
                } else if let Ok(f) = text.parse::<f64>() {
                    Ok(Value::Float(f))
                } else {
                    Err(RemoteError::Malformed)
                }
            }
        },
    }
}

/// Decode the generated key from a push response
pub fn parse_push_response(body: &[u8]) -> Result<PushId, RemoteError> {
    let (parsed, _) = serde_json_core::from_slice::<PushResponse>(body)
        .map_err(|_| RemoteError::Malformed)?;
    PushId::try_from(parsed.name).map_err(|_| RemoteError::ValueTooLong)
}

fn parse_string_value(text: &str) -> Result<Value, RemoteError> {
    if text.len() < 2 || !text.ends_with('"') {
        return Err(RemoteError::Malformed);
    }
    let inner = &text[1..text.len() - 1];

    // Schedule strings never need escapes
    if inner.contains('\\') || inner.contains('"') {
        return Err(RemoteError::Malformed);
    }
    if inner.len() > MAX_TIME_LEN {
        return Err(RemoteError::ValueTooLong);
    }
    TimeString::try_from(inner)
        .map(Value::Str)
        .map_err(|_| RemoteError::ValueTooLong)
}

fn push_truncated(out: &mut Reason, text: &str) {
    for c in text.chars() {
        if out.len() + c.len_utf8() > MAX_REASON_LEN {
            break;
        }
        let _ = out.push(c);
    }
}
