//! Build script for ezfeeder-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates feeder.toml at compile time, with the `toml` crate and with
//!   the parser the firmware runs at boot

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    validate_settings();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate feeder.toml at compile time
fn validate_settings() {
    println!("cargo:rerun-if-changed=feeder.toml");

    let settings_path = Path::new("feeder.toml");

    if !settings_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: feeder.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds feeder.toml as its fallback settings.       ║\n\
            ║  Please create one in the ezfeeder-firmware directory.           ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(settings_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read feeder.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let settings: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in feeder.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_wifi(&settings, &mut errors);
    validate_remote(&settings, &mut errors);
    validate_ntp(&settings, &mut errors);
    validate_motor(&settings, &mut errors);
    validate_feeder(&settings, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid settings in feeder.toml                          ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    check_device_parser(&content);

    println!("cargo:warning=feeder.toml validated successfully");
}

/// Run the on-device parser so the firmware never halts on the embedded file
fn check_device_parser(content: &str) {
    let problem = match ezfeeder_core::config::parse_settings(content) {
        Ok(settings) => match settings.validate() {
            Ok(()) => return,
            Err(e) => format!("settings rejected: {:?}", e),
        },
        Err(e) => format!("device parser error: {:?}", e),
    };

    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: feeder.toml is not readable by the firmware              ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        ║  {:<64} ║\n\
        ║                                                                  ║\n\
        ║  The device parser accepts bare keys, '...' or \"...\" strings     ║\n\
        ║  without escapes, and decimal integers.                          ║\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        problem
    );
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn section<'a>(
    settings: &'a toml::Value,
    name: &str,
    errors: &mut Vec<String>,
) -> Option<&'a toml::value::Table> {
    match settings.get(name) {
        Some(toml::Value::Table(t)) => Some(t),
        Some(_) => {
            errors.push(format!("[{}] must be a table", name));
            None
        }
        None => None,
    }
}

/// Check a string key, its maximum length and whether it may be empty
fn check_string(
    table: &toml::value::Table,
    section: &str,
    key: &str,
    max_len: usize,
    required: bool,
    errors: &mut Vec<String>,
) {
    match table.get(key) {
        Some(toml::Value::String(s)) => {
            if required && s.is_empty() {
                errors.push(format!("[{}] {} must not be empty", section, key));
            }
            if s.len() > max_len {
                errors.push(format!("[{}] {} longer than {} bytes", section, key, max_len));
            }
            if s.contains('"') || s.contains('\\') {
                errors.push(format!("[{}] {} must not contain quotes", section, key));
            }
        }
        Some(_) => errors.push(format!("[{}] {} must be a string", section, key)),
        None if required => errors.push(format!("[{}] missing '{}'", section, key)),
        None => {}
    }
}

/// Check an integer key against an inclusive range
fn check_int(
    table: &toml::value::Table,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) {
    match table.get(key) {
        Some(toml::Value::Integer(n)) => {
            if !range.contains(n) {
                errors.push(format!(
                    "[{}] {} must be {}-{}",
                    section,
                    key,
                    range.start(),
                    range.end()
                ));
            }
        }
        Some(_) => errors.push(format!("[{}] {} must be an integer", section, key)),
        None => {}
    }
}

fn validate_wifi(settings: &toml::Value, errors: &mut Vec<String>) {
    match section(settings, "wifi", errors) {
        Some(wifi) => {
            check_string(wifi, "wifi", "ssid", 32, true, errors);
            check_string(wifi, "wifi", "password", 64, false, errors);
        }
        None => errors.push("Missing [wifi] section".to_string()),
    }
}

fn validate_remote(settings: &toml::Value, errors: &mut Vec<String>) {
    match section(settings, "remote", errors) {
        Some(remote) => {
            check_string(remote, "remote", "host", 64, true, errors);
            check_string(remote, "remote", "auth", 64, false, errors);
            check_string(remote, "remote", "user", 48, true, errors);
        }
        None => errors.push("Missing [remote] section".to_string()),
    }
}

fn validate_ntp(settings: &toml::Value, errors: &mut Vec<String>) {
    if let Some(ntp) = section(settings, "ntp", errors) {
        check_string(ntp, "ntp", "server", 64, false, errors);
        check_int(ntp, "ntp", "utc_offset_s", -50_400..=50_400, errors);
        check_int(ntp, "ntp", "update_interval_s", 1..=86_400, errors);
    }
}

fn validate_motor(settings: &toml::Value, errors: &mut Vec<String>) {
    if let Some(motor) = section(settings, "motor", errors) {
        check_int(motor, "motor", "max_speed", 1..=20_000, errors);
        check_int(motor, "motor", "acceleration", 1..=1_000_000, errors);
    }
}

fn validate_feeder(settings: &toml::Value, errors: &mut Vec<String>) {
    if let Some(feeder) = section(settings, "feeder", errors) {
        check_int(feeder, "feeder", "tick_ms", 1..=60_000, errors);
        match feeder.get("single_feed_per_tick") {
            Some(toml::Value::Boolean(_)) | None => {}
            Some(_) => errors.push("[feeder] single_feed_per_tick must be a boolean".to_string()),
        }
    }
}
