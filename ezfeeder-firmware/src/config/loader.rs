//! Settings persistence
//!
//! Loads device settings from flash storage.
//! Falls back to the embedded settings if flash is empty or invalid.

use core::str;
use defmt::*;

use ezfeeder_core::config::{parse_settings, DeviceSettings, ParseError, SettingsError};
use ezfeeder_hal_rp2040::flash::{FlashError, Rp2040FlashStorage, StorageKey};
// Import the FlashStorage trait to bring methods into scope
use ezfeeder_hal_rp2040::FlashStorageTrait;

/// Maximum TOML settings size
const MAX_TOML_SIZE: usize = 1024;

/// Embedded fallback settings (compiled into firmware)
/// Edit feeder.toml and rebuild to customize
const EMBEDDED_SETTINGS: &str = include_str!("../../feeder.toml");

/// Settings loading errors
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// Flash operation failed
    Flash(FlashError),
    /// Invalid UTF-8 in TOML data
    InvalidUtf8,
    /// TOML parsing failed
    Parse(ParseError),
    /// Settings parsed but are unusable
    Invalid(SettingsError),
}

impl From<FlashError> for LoadError {
    fn from(e: FlashError) -> Self {
        LoadError::Flash(e)
    }
}

impl From<ParseError> for LoadError {
    fn from(e: ParseError) -> Self {
        LoadError::Parse(e)
    }
}

impl From<SettingsError> for LoadError {
    fn from(e: SettingsError) -> Self {
        LoadError::Invalid(e)
    }
}

/// Settings persistence manager
///
/// Handles loading device settings from flash storage.
pub struct SettingsPersistence<'d> {
    storage: Rp2040FlashStorage<'d>,
}

impl<'d> SettingsPersistence<'d> {
    /// Create a new settings persistence manager
    pub fn new(storage: Rp2040FlashStorage<'d>) -> Self {
        Self { storage }
    }

    /// Consume this persistence manager and return the underlying storage
    ///
    /// The feed config store reuses the same storage afterwards.
    pub fn into_storage(self) -> Rp2040FlashStorage<'d> {
        self.storage
    }

    /// Load provisioned settings from flash
    pub async fn load(&mut self) -> Result<DeviceSettings, LoadError> {
        let mut buffer = [0u8; MAX_TOML_SIZE];
        let len = self
            .storage
            .read(StorageKey::DeviceSettings, &mut buffer)
            .await?;

        debug!("Read {} bytes of settings from flash", len);

        let toml_str = str::from_utf8(&buffer[..len]).map_err(|_| LoadError::InvalidUtf8)?;
        parse_validated(toml_str)
    }
}

fn parse_validated(toml_str: &str) -> Result<DeviceSettings, LoadError> {
    let settings = parse_settings(toml_str)?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from flash, or the embedded file when flash has none
///
/// Returns the storage for reuse alongside the settings.
pub async fn load_settings<'d>(
    storage: Rp2040FlashStorage<'d>,
) -> (Rp2040FlashStorage<'d>, Result<DeviceSettings, LoadError>) {
    let mut persistence = SettingsPersistence::new(storage);

    let settings = match persistence.load().await {
        Ok(settings) => {
            info!("Loaded settings from flash");
            Ok(settings)
        }
        Err(LoadError::Flash(FlashError::NotFound)) => {
            info!("No settings in flash, using embedded settings");
            parse_validated(EMBEDDED_SETTINGS)
        }
        Err(e) => {
            warn!("Invalid settings in flash: {:?}, using embedded settings", e);
            parse_validated(EMBEDDED_SETTINGS)
        }
    };

    if let Ok(settings) = &settings {
        log_settings_summary(settings);
    }

    (persistence.into_storage(), settings)
}

/// Log a summary of the loaded settings (never the secrets)
fn log_settings_summary(settings: &DeviceSettings) {
    info!("Settings loaded successfully");
    debug!("  wifi ssid: {}", settings.wifi.ssid.as_str());
    debug!("  remote host: {}", settings.remote.host.as_str());
    debug!("  remote user: {}", settings.remote.user.as_str());
    debug!(
        "  ntp: {} offset {}s every {}s",
        settings.ntp.server.as_str(),
        settings.ntp.utc_offset_s,
        settings.ntp.update_interval_s
    );
    debug!(
        "  motor: {} steps/s, {} steps/s^2",
        settings.motor.max_speed,
        settings.motor.acceleration
    );
    debug!(
        "  feeder: tick {}ms, single feed per tick {}",
        settings.feeder.tick_ms,
        settings.feeder.single_feed_per_tick
    );
}
