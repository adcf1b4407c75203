//! Remote-to-flash configuration sync
//!
//! Pulls the portion quantity and the three schedule times from the remote
//! store, one independent read per field. A field whose read fails keeps its
//! previous value. The merged record is then written to flash once. There is
//! no retry; the next sync happens at the next boot.

use ezfeeder_hal::FlashStorage;

use crate::config::{portions_from_remote, FeedConfig, Slot, SLOT_COUNT};
use crate::remote::{RemoteError, RemotePaths, RemoteStore};
use crate::store::{ConfigStore, StoreError};

/// Result of one field read
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldOutcome {
    /// Field overwritten with the remote value
    Updated,
    /// Read failed, previous value kept
    Failed(RemoteError),
}

impl FieldOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, FieldOutcome::Updated)
    }
}

/// Outcome of a full sync
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncReport {
    /// Portion quantity read
    pub portions: FieldOutcome,
    /// Schedule slot reads, in slot order
    pub slots: [FieldOutcome; SLOT_COUNT],
    /// Flash write result (bytes written)
    pub saved: Result<usize, StoreError>,
}

impl SyncReport {
    /// Number of fields that were updated
    pub fn updated_fields(&self) -> usize {
        core::iter::once(&self.portions)
            .chain(self.slots.iter())
            .filter(|o| o.is_updated())
            .count()
    }
}

/// Refresh `config` from the remote store and persist it
pub async fn sync_config<R, S>(
    remote: &mut R,
    paths: &RemotePaths,
    store: &mut ConfigStore<S>,
    config: &mut FeedConfig,
) -> SyncReport
where
    R: RemoteStore,
    S: FlashStorage,
{
    let portions = match remote.get_int(paths.portions.as_str()).await {
        Ok(raw) => {
            config.portions = portions_from_remote(raw);
            FieldOutcome::Updated
        }
        Err(e) => FieldOutcome::Failed(e),
    };

    let mut slots = [
        FieldOutcome::Updated,
        FieldOutcome::Updated,
        FieldOutcome::Updated,
    ];
    for slot in Slot::ALL {
        slots[slot.index()] = match remote.get_string(paths.slot(slot)).await {
            Ok(time) => {
                *config.slot_mut(slot) = time;
                FieldOutcome::Updated
            }
            Err(e) => FieldOutcome::Failed(e),
        };
    }

    let saved = store.save(config).await;

    SyncReport {
        portions,
        slots,
        saved,
    }
}
