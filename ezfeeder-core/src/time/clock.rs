//! NTP-disciplined clock
//!
//! Keeps the Unix time of the last successful NTP reply together with the
//! monotonic time it arrived at, and extrapolates from there. The network is
//! queried at most once per update interval, counted from the last attempt
//! whether or not it succeeded. A failed query keeps the old reference.
//! Before the first reply the clock counts from the Unix epoch.

use super::ntp::{self, NtpError, NTP_PACKET_LEN};
use super::{format_hms, ClockString};
use crate::config::NtpSettings;

/// Packet exchange with an NTP server
pub trait NtpTransport {
    /// Send `request` and fill `response` with the reply
    ///
    /// Returns the number of bytes received.
    fn exchange(
        &mut self,
        request: &[u8; NTP_PACKET_LEN],
        response: &mut [u8; NTP_PACKET_LEN],
    ) -> impl core::future::Future<Output = Result<usize, NtpError>>;
}

/// What happened to the network reference during a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncAttempt {
    /// Reference still fresh, no query made
    Skipped,
    /// Query succeeded and the reference was replaced
    Synced,
    /// Query failed, old reference kept
    Failed(NtpError),
}

/// One clock reading
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockReading {
    /// Local time of day
    pub hms: ClockString,
    /// Network refresh outcome
    pub sync: SyncAttempt,
}

/// Clock reference without I/O
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockState {
    utc_offset_s: i32,
    update_interval_ms: u64,
    /// Monotonic time of the last query, successful or not
    attempted_at_ms: Option<u64>,
    /// Monotonic time of the last successful sync
    synced_at_ms: Option<u64>,
    /// Unix seconds received at `synced_at_ms`
    unix_at_sync: u32,
}

impl ClockState {
    /// Create an unsynchronized clock
    pub fn new(utc_offset_s: i32, update_interval_s: u32) -> Self {
        Self {
            utc_offset_s,
            update_interval_ms: update_interval_s as u64 * 1000,
            attempted_at_ms: None,
            synced_at_ms: None,
            unix_at_sync: 0,
        }
    }

    /// Create from NTP settings
    pub fn from_settings(settings: &NtpSettings) -> Self {
        Self::new(settings.utc_offset_s, settings.update_interval_s)
    }

    /// Whether a query is due
    pub fn needs_update(&self, now_ms: u64) -> bool {
        match self.attempted_at_ms {
            None => true,
            Some(at) => now_ms.saturating_sub(at) >= self.update_interval_ms,
        }
    }

    /// Record that a query is being made
    pub fn note_attempt(&mut self, now_ms: u64) {
        self.attempted_at_ms = Some(now_ms);
    }

    /// Record a successful reply
    pub fn apply_sync(&mut self, unix_seconds: u32, now_ms: u64) {
        self.unix_at_sync = unix_seconds;
        self.attempted_at_ms = Some(now_ms);
        self.synced_at_ms = Some(now_ms);
    }

    /// Extrapolated Unix seconds (UTC)
    pub fn unix_seconds(&self, now_ms: u64) -> i64 {
        let since = now_ms.saturating_sub(self.synced_at_ms.unwrap_or(0));
        self.unix_at_sync as i64 + (since / 1000) as i64
    }

    /// Local `HH:MM:SS`
    pub fn hms(&self, now_ms: u64) -> ClockString {
        format_hms(self.unix_seconds(now_ms), self.utc_offset_s)
    }
}

/// Clock that refreshes itself over an [`NtpTransport`]
pub struct NtpClock<T> {
    transport: T,
    state: ClockState,
}

impl<T: NtpTransport> NtpClock<T> {
    /// Create an unsynchronized clock
    pub fn new(transport: T, state: ClockState) -> Self {
        Self { transport, state }
    }

    /// Current reference
    pub fn state(&self) -> &ClockState {
        &self.state
    }

    /// Query the server now, regardless of the update interval
    pub async fn force_update(&mut self, now_ms: u64) -> Result<u32, NtpError> {
        self.state.note_attempt(now_ms);
        let request = ntp::request_packet();
        let mut response = [0u8; NTP_PACKET_LEN];
        let len = self.transport.exchange(&request, &mut response).await?;
        let unix = ntp::parse_response(&response[..len])?;
        self.state.apply_sync(unix, now_ms);
        Ok(unix)
    }

    /// Read the time, querying the server first when the reference is stale
    pub async fn read(&mut self, now_ms: u64) -> ClockReading {
        let sync = if self.state.needs_update(now_ms) {
            match self.force_update(now_ms).await {
                Ok(_) => SyncAttempt::Synced,
                Err(e) => SyncAttempt::Failed(e),
            }
        } else {
            SyncAttempt::Skipped
        };

        ClockReading {
            hms: self.state.hms(now_ms),
            sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockNtpServer;
    use embassy_futures::block_on;

    #[test]
    fn test_unsynced_counts_from_epoch() {
        let state = ClockState::new(-10_800, 60);
        assert!(state.needs_update(0));
        assert_eq!(state.hms(0).as_str(), "21:00:00");
        assert_eq!(state.hms(61_500).as_str(), "21:01:01");
    }

    #[test]
    fn test_update_interval() {
        let mut state = ClockState::new(0, 60);
        state.apply_sync(1_704_106_800, 10_000);

        assert!(!state.needs_update(10_000));
        assert!(!state.needs_update(69_999));
        assert!(state.needs_update(70_000));
    }

    #[test]
    fn test_extrapolates_from_reference() {
        let mut state = ClockState::new(-10_800, 60);
        // 2024-01-01T11:00:00Z
        state.apply_sync(1_704_106_800, 5_000);
        assert_eq!(state.hms(5_000).as_str(), "08:00:00");
        assert_eq!(state.hms(7_999).as_str(), "08:00:02");
        assert_eq!(state.hms(65_000).as_str(), "08:01:00");
    }

    #[test]
    fn test_read_syncs_once_per_interval() {
        let server = MockNtpServer::replying(1_704_106_800);
        let mut clock = NtpClock::new(server, ClockState::new(-10_800, 60));

        let reading = block_on(clock.read(1_000));
        assert_eq!(reading.sync, SyncAttempt::Synced);
        assert_eq!(reading.hms.as_str(), "08:00:00");

        let reading = block_on(clock.read(2_000));
        assert_eq!(reading.sync, SyncAttempt::Skipped);
        assert_eq!(reading.hms.as_str(), "08:00:01");

        let reading = block_on(clock.read(61_000));
        assert_eq!(reading.sync, SyncAttempt::Synced);
        assert_eq!(clock.transport.queries, 2);
    }

    #[test]
    fn test_failed_sync_keeps_reference() {
        let mut clock = NtpClock::new(
            MockNtpServer::replying(1_704_106_800),
            ClockState::new(0, 60),
        );
        block_on(clock.read(0));

        clock.transport.fail = Some(NtpError::Timeout);
        let reading = block_on(clock.read(120_000));
        assert_eq!(reading.sync, SyncAttempt::Failed(NtpError::Timeout));
        assert_eq!(reading.hms.as_str(), "11:02:00");
        assert!(!clock.state().needs_update(120_000));
        assert!(clock.state().needs_update(180_000));
    }

    #[test]
    fn test_outage_retries_once_per_interval() {
        let mut clock = NtpClock::new(
            MockNtpServer::replying(1_704_106_800),
            ClockState::new(0, 60),
        );
        block_on(clock.read(0));
        clock.transport.fail = Some(NtpError::Timeout);

        // Ten 200 ms ticks after the interval elapsed
        let mut failed = 0;
        for tick in 0..10u64 {
            let reading = block_on(clock.read(60_000 + tick * 200));
            if let SyncAttempt::Failed(_) = reading.sync {
                failed += 1;
            } else {
                assert_eq!(reading.sync, SyncAttempt::Skipped);
            }
        }
        assert_eq!(failed, 1);
        assert_eq!(clock.transport.queries, 2);

        // Next retry waits a full interval from the failed attempt
        clock.transport.fail = None;
        assert_eq!(block_on(clock.read(119_999)).sync, SyncAttempt::Skipped);
        assert_eq!(block_on(clock.read(120_000)).sync, SyncAttempt::Synced);
        assert_eq!(clock.transport.queries, 3);
    }

    #[test]
    fn test_failed_first_sync_waits_interval() {
        let mut server = MockNtpServer::replying(1_704_106_800);
        server.fail = Some(NtpError::Dns);
        let mut clock = NtpClock::new(server, ClockState::new(0, 60));

        assert_eq!(
            block_on(clock.read(0)).sync,
            SyncAttempt::Failed(NtpError::Dns)
        );
        assert_eq!(block_on(clock.read(200)).sync, SyncAttempt::Skipped);
        assert_eq!(clock.transport.queries, 1);
    }
}
