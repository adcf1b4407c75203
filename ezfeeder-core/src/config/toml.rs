//! Simple TOML parser for device settings
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the feeder settings file. It does NOT support the full TOML grammar.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - Basic `"..."` and literal `'...'` strings
//! - `_` separators between integer digits
//! - [section] headers
//! - Comments (# ...), including after headers and values
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings and escape sequences
//! - Quoted and dotted keys
//!
//! The firmware build script runs this parser over the embedded settings
//! file, so anything it rejects fails the build.

use heapless::String;

use super::device::DeviceSettings;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Unknown key for the current section
    UnknownKey,
    /// Invalid value type
    InvalidValue,
    /// String value longer than its field allows
    TooLong,
    /// Line is neither a header, a comment nor `key = value`
    InvalidLine,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Wifi,
    Remote,
    Ntp,
    Motor,
    Feeder,
}

/// Parse TOML settings into DeviceSettings
///
/// Keys that are not present keep their defaults.
pub fn parse_settings(input: &str) -> Result<DeviceSettings, ParseError> {
    let mut settings = DeviceSettings::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = strip_comment(line.trim());

        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine)?;
        apply_value(section, key, value, &mut settings)?;
    }

    Ok(settings)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "wifi" => Ok(Section::Wifi),
        "remote" => Ok(Section::Remote),
        "ntp" => Ok(Section::Ntp),
        "motor" => Ok(Section::Motor),
        "feeder" => Ok(Section::Feeder),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Drop a trailing comment, ignoring '#' inside quoted strings
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (i, c) in line.char_indices() {
        match (c, quote) {
            ('"' | '\'', None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            ('#', None) => return line[..i].trim_end(),
            _ => {}
        }
    }
    line
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a basic or literal string value into a bounded string
fn parse_string<const N: usize>(value: &str) -> Result<String<N>, ParseError> {
    let inner = match value.as_bytes() {
        [b'"', .., b'"'] => {
            let inner = &value[1..value.len() - 1];
            if inner.contains('\\') || inner.contains('"') {
                return Err(ParseError::InvalidValue);
            }
            inner
        }
        [b'\'', .., b'\''] => {
            let inner = &value[1..value.len() - 1];
            if inner.contains('\'') {
                return Err(ParseError::InvalidValue);
            }
            inner
        }
        _ => return Err(ParseError::InvalidValue),
    };
    String::try_from(inner).map_err(|_| ParseError::TooLong)
}

/// Parse an integer value
///
/// A `_` is accepted only between two digits.
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    let bytes = value.as_bytes();
    let mut digits: String<24> = String::new();

    for (i, &b) in bytes.iter().enumerate() {
        if b == b'_' {
            let before = i > 0 && bytes[i - 1].is_ascii_digit();
            let after = bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
            if !(before && after) {
                return Err(ParseError::InvalidValue);
            }
            continue;
        }
        digits.push(b as char).map_err(|_| ParseError::InvalidValue)?;
    }

    digits.parse().map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    settings: &mut DeviceSettings,
) -> Result<(), ParseError> {
    match (section, key) {
        (Section::Wifi, "ssid") => settings.wifi.ssid = parse_string(value)?,
        (Section::Wifi, "password") => settings.wifi.password = parse_string(value)?,
        (Section::Remote, "host") => settings.remote.host = parse_string(value)?,
        (Section::Remote, "auth") => settings.remote.auth = parse_string(value)?,
        (Section::Remote, "user") => settings.remote.user = parse_string(value)?,
        (Section::Ntp, "server") => settings.ntp.server = parse_string(value)?,
        (Section::Ntp, "utc_offset_s") => settings.ntp.utc_offset_s = parse_int(value)?,
        (Section::Ntp, "update_interval_s") => settings.ntp.update_interval_s = parse_int(value)?,
        (Section::Motor, "max_speed") => settings.motor.max_speed = parse_int(value)?,
        (Section::Motor, "acceleration") => settings.motor.acceleration = parse_int(value)?,
        (Section::Feeder, "tick_ms") => settings.feeder.tick_ms = parse_int(value)?,
        (Section::Feeder, "single_feed_per_tick") => {
            settings.feeder.single_feed_per_tick = parse_bool(value)?
        }
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
# Feeder settings
[wifi]
ssid = "home-network"
password = "hunter2"   # not a real one

[remote]
host = "ezfeeder.firebaseio.com"
auth = "s3cr3t"
user = "u-42"

[ntp]
server = "pool.ntp.org"
utc_offset_s = -10800
update_interval_s = 120

[motor]
max_speed = 800
acceleration = 12000

[feeder]
tick_ms = 250
single_feed_per_tick = true
"#;

    #[test]
    fn test_parse_full_settings() {
        let s = parse_settings(FULL).unwrap();
        assert_eq!(s.wifi.ssid.as_str(), "home-network");
        assert_eq!(s.wifi.password.as_str(), "hunter2");
        assert_eq!(s.remote.host.as_str(), "ezfeeder.firebaseio.com");
        assert_eq!(s.remote.auth.as_str(), "s3cr3t");
        assert_eq!(s.remote.user.as_str(), "u-42");
        assert_eq!(s.ntp.server.as_str(), "pool.ntp.org");
        assert_eq!(s.ntp.utc_offset_s, -10_800);
        assert_eq!(s.ntp.update_interval_s, 120);
        assert_eq!(s.motor.max_speed, 800);
        assert_eq!(s.motor.acceleration, 12_000);
        assert_eq!(s.feeder.tick_ms, 250);
        assert!(s.feeder.single_feed_per_tick);
        assert_eq!(s.validate(), Ok(()));
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let s = parse_settings("[wifi]\nssid = \"x\"\n").unwrap();
        assert_eq!(s.wifi.ssid.as_str(), "x");
        assert_eq!(s.ntp, DeviceSettings::default().ntp);
        assert_eq!(s.motor, DeviceSettings::default().motor);
    }

    #[test]
    fn test_hash_inside_string() {
        let s = parse_settings("[wifi]\npassword = \"a#b\" # comment\n").unwrap();
        assert_eq!(s.wifi.password.as_str(), "a#b");
    }

    #[test]
    fn test_comment_after_header() {
        let s = parse_settings("[wifi] # station\nssid = \"x\"\n[ntp]#clock\nutc_offset_s = 0\n")
            .unwrap();
        assert_eq!(s.wifi.ssid.as_str(), "x");
        assert_eq!(s.ntp.utc_offset_s, 0);
    }

    #[test]
    fn test_literal_strings() {
        let s =
            parse_settings("[wifi]\nssid = 'cafe \"wifi\"'\npassword = 'a#b' # comment\n").unwrap();
        assert_eq!(s.wifi.ssid.as_str(), "cafe \"wifi\"");
        assert_eq!(s.wifi.password.as_str(), "a#b");
    }

    #[test]
    fn test_digit_separators() {
        let s = parse_settings("[motor]\nacceleration = 15_000\n[ntp]\nutc_offset_s = -10_800\n")
            .unwrap();
        assert_eq!(s.motor.acceleration, 15_000);
        assert_eq!(s.ntp.utc_offset_s, -10_800);

        for bad in [
            "[motor]\nacceleration = _15000\n",
            "[motor]\nacceleration = 15000_\n",
            "[motor]\nacceleration = 15__000\n",
            "[ntp]\nutc_offset_s = -_10\n",
        ] {
            assert_eq!(
                parse_settings(bad).unwrap_err(),
                ParseError::InvalidValue,
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_escapes_rejected() {
        assert_eq!(
            parse_settings("[wifi]\nssid = \"a\\tb\"\n").unwrap_err(),
            ParseError::InvalidValue
        );
    }

    #[test]
    fn test_embedded_settings_file_parses() {
        let s = parse_settings(include_str!("../../../ezfeeder-firmware/feeder.toml")).unwrap();
        assert_eq!(s.validate(), Ok(()));
        assert_eq!(s.ntp.utc_offset_s, -10_800);
        assert_eq!(s.motor.acceleration, 15_000);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse_settings("[display]\n").unwrap_err(),
            ParseError::InvalidSection
        );
        assert_eq!(
            parse_settings("[wifi]\nchannel = 6\n").unwrap_err(),
            ParseError::UnknownKey
        );
        assert_eq!(
            parse_settings("[motor]\nmax_speed = fast\n").unwrap_err(),
            ParseError::InvalidValue
        );
        assert_eq!(
            parse_settings("[wifi]\nssid = home\n").unwrap_err(),
            ParseError::InvalidValue
        );
        assert_eq!(
            parse_settings("[feeder]\njust some words\n").unwrap_err(),
            ParseError::InvalidLine
        );
        assert_eq!(
            parse_settings("[wifi]\nssid = \"0123456789012345678901234567890123456789\"\n")
                .unwrap_err(),
            ParseError::TooLong
        );
    }
}
