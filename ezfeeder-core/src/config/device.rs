//! Device settings
//!
//! Network credentials, remote store location, clock and motor parameters.
//! These used to be compiled into the image; they are now provisioned as a
//! TOML record in flash, with an embedded file as fallback.

use heapless::String;

/// Maximum Wi-Fi SSID length (802.11 limit)
pub const MAX_SSID_LEN: usize = 32;

/// Maximum Wi-Fi passphrase length (WPA2 limit)
pub const MAX_PASSWORD_LEN: usize = 64;

/// Maximum host name length
pub const MAX_HOST_LEN: usize = 64;

/// Maximum database secret length
pub const MAX_SECRET_LEN: usize = 64;

/// Maximum user id length
pub const MAX_USER_LEN: usize = 48;

/// Wi-Fi station settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WifiSettings {
    /// Network name
    pub ssid: String<MAX_SSID_LEN>,
    /// Network passphrase (empty for open networks)
    pub password: String<MAX_PASSWORD_LEN>,
}

/// Remote database settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemoteSettings {
    /// Database host, e.g. `my-feeder.firebaseio.com`
    pub host: String<MAX_HOST_LEN>,
    /// Database secret passed as the `auth` query parameter
    pub auth: String<MAX_SECRET_LEN>,
    /// User id the schedule and log live under
    pub user: String<MAX_USER_LEN>,
}

/// Network time settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NtpSettings {
    /// NTP server host name
    pub server: String<MAX_HOST_LEN>,
    /// Fixed offset from UTC in seconds
    pub utc_offset_s: i32,
    /// Minimum time between NTP queries in seconds
    pub update_interval_s: u32,
}

impl Default for NtpSettings {
    fn default() -> Self {
        let mut server = String::new();
        let _ = server.push_str("pool.ntp.br");
        Self {
            server,
            utc_offset_s: -10_800,
            update_interval_s: 60,
        }
    }
}

/// Stepper motion settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorSettings {
    /// Cruise speed in steps per second
    pub max_speed: u32,
    /// Acceleration in steps per second squared
    pub acceleration: u32,
}

impl Default for MotorSettings {
    fn default() -> Self {
        Self {
            max_speed: 700,
            acceleration: 15_000,
        }
    }
}

/// Main loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeederSettings {
    /// Sleep between ticks in milliseconds
    pub tick_ms: u32,
    /// Feed at most once per tick when the schedule and the button both trigger
    pub single_feed_per_tick: bool,
}

impl Default for FeederSettings {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            single_feed_per_tick: false,
        }
    }
}

/// Settings validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// `[wifi] ssid` is empty
    MissingSsid,
    /// `[remote] host` is empty
    MissingHost,
    /// `[remote] user` is empty
    MissingUser,
    /// `[motor]` speed or acceleration is zero
    InvalidMotion,
    /// `[feeder] tick_ms` is zero
    InvalidTick,
}

/// Complete device settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceSettings {
    pub wifi: WifiSettings,
    pub remote: RemoteSettings,
    pub ntp: NtpSettings,
    pub motor: MotorSettings,
    pub feeder: FeederSettings,
}

impl DeviceSettings {
    /// Check that the settings are usable
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.wifi.ssid.is_empty() {
            return Err(SettingsError::MissingSsid);
        }
        if self.remote.host.is_empty() {
            return Err(SettingsError::MissingHost);
        }
        if self.remote.user.is_empty() {
            return Err(SettingsError::MissingUser);
        }
        if self.motor.max_speed == 0 || self.motor.acceleration == 0 {
            return Err(SettingsError::InvalidMotion);
        }
        if self.feeder.tick_ms == 0 {
            return Err(SettingsError::InvalidTick);
        }
        Ok(())
    }
}
