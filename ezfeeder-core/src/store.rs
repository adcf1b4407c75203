//! Persistent config store
//!
//! Keeps the [`FeedConfig`] record in flash as compact JSON. Loading never
//! fails: a missing, unreadable or non-object record yields defaults, and a
//! bad field yields the default for that field only.

use core::str;

use ezfeeder_hal::{FlashError, FlashStorage, StorageKey};
use heapless::String;

use crate::config::FeedConfig;

/// Maximum serialized record size
pub const MAX_RECORD_LEN: usize = 256;

/// Config store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Flash operation failed
    Flash(FlashError),
    /// Record did not fit the serialization buffer
    Serialize,
    /// Stored bytes are not valid UTF-8
    InvalidUtf8,
}

impl From<FlashError> for StoreError {
    fn from(e: FlashError) -> Self {
        StoreError::Flash(e)
    }
}

/// Why defaults were substituted on load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadFailure {
    /// No record has ever been written
    Missing,
    /// Storage read failed
    Unreadable(FlashError),
    /// Record is not a JSON object
    Malformed,
}

/// Outcome of [`ConfigStore::load_with_status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadStatus {
    /// Record was read and decoded
    Loaded,
    /// Defaults were used
    Defaulted(LoadFailure),
}

/// Flash-backed store for the feed configuration
pub struct ConfigStore<S> {
    storage: S,
}

impl<S: FlashStorage> ConfigStore<S> {
    /// Create a store over the given flash storage
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Consume the store and return the underlying storage
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Load the record, substituting defaults on any failure
    pub async fn load(&mut self) -> FeedConfig {
        self.load_with_status().await.0
    }

    /// Load the record and report whether defaults were used
    pub async fn load_with_status(&mut self) -> (FeedConfig, LoadStatus) {
        let mut buffer = [0u8; MAX_RECORD_LEN];
        let len = match self.storage.read(StorageKey::FeedConfig, &mut buffer).await {
            Ok(len) => len,
            Err(FlashError::NotFound) => {
                return (
                    FeedConfig::default(),
                    LoadStatus::Defaulted(LoadFailure::Missing),
                )
            }
            Err(e) => {
                return (
                    FeedConfig::default(),
                    LoadStatus::Defaulted(LoadFailure::Unreadable(e)),
                )
            }
        };

        match FeedConfig::from_json(&buffer[..len]) {
            Some(config) => (config, LoadStatus::Loaded),
            None => (
                FeedConfig::default(),
                LoadStatus::Defaulted(LoadFailure::Malformed),
            ),
        }
    }

    /// Replace the stored record
    ///
    /// The old record is removed before the new one is written, so a failed
    /// write leaves no record and the next load falls back to defaults.
    /// Returns the number of bytes written.
    pub async fn save(&mut self, config: &FeedConfig) -> Result<usize, StoreError> {
        let mut buffer = [0u8; MAX_RECORD_LEN];
        let len =
            serde_json_core::to_slice(config, &mut buffer).map_err(|_| StoreError::Serialize)?;

        self.storage.remove(StorageKey::FeedConfig).await?;
        self.storage
            .write(StorageKey::FeedConfig, &buffer[..len])
            .await?;

        Ok(len)
    }

    /// Read the raw stored record as text
    pub async fn dump(&mut self) -> Result<String<MAX_RECORD_LEN>, StoreError> {
        let mut buffer = [0u8; MAX_RECORD_LEN];
        let len = self.storage.read(StorageKey::FeedConfig, &mut buffer).await?;
        let text = str::from_utf8(&buffer[..len]).map_err(|_| StoreError::InvalidUtf8)?;

        // len <= MAX_RECORD_LEN, so this always fits
        String::try_from(text).map_err(|_| StoreError::Serialize)
    }
}
