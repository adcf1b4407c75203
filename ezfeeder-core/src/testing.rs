//! In-memory fakes for host tests

use embedded_hal_async::delay::DelayNs;
use ezfeeder_hal::{FlashError, FlashStorage, InputPin, OutputPin, StorageKey};
use heapless::{FnvIndexMap, String, Vec};

use crate::config::TimeString;
use crate::remote::{RemoteError, RemotePath, RemoteStore};
use crate::time::ntp::{NtpError, NTP_PACKET_LEN, NTP_UNIX_OFFSET};
use crate::time::{ClockReading, ClockString, NtpTransport, SyncAttempt, TimeSource};
use crate::traits::{StepperDriver, StepperError};

const RECORD_CAP: usize = 512;

/// Key-value flash held in RAM
#[derive(Default)]
pub struct MemFlash {
    records: FnvIndexMap<u8, Vec<u8, RECORD_CAP>, 4>,
    pub removals: u32,
    pub writes: u32,
    pub fail_writes: bool,
    pub fail_reads: bool,
}

impl MemFlash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw record without counting it as a write
    pub fn put(&mut self, key: StorageKey, data: &[u8]) {
        let record = Vec::from_slice(data).unwrap();
        self.records.insert(key.as_u8(), record).unwrap();
    }
}

impl FlashStorage for MemFlash {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        if self.fail_reads {
            return Err(FlashError::Storage);
        }
        let record = self.records.get(&key.as_u8()).ok_or(FlashError::NotFound)?;
        if record.len() > buffer.len() {
            return Err(FlashError::BufferTooSmall);
        }
        buffer[..record.len()].copy_from_slice(record);
        Ok(record.len())
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        if self.fail_writes {
            return Err(FlashError::Flash);
        }
        let record = Vec::from_slice(data).map_err(|_| FlashError::Full)?;
        self.records
            .insert(key.as_u8(), record)
            .map_err(|_| FlashError::Full)?;
        self.writes += 1;
        Ok(())
    }

    async fn remove(&mut self, key: StorageKey) -> Result<(), FlashError> {
        self.records.remove(&key.as_u8());
        self.removals += 1;
        Ok(())
    }
}

/// Remote store answering from per-path tables
///
/// Paths without an entry fail with [`RemoteError::Connection`].
pub struct MockRemote {
    ints: Vec<(RemotePath, Result<i64, RemoteError>), 8>,
    strings: Vec<(RemotePath, Result<TimeString, RemoteError>), 8>,
    pub push_result: Result<(), RemoteError>,
    pub pushes: Vec<RemotePath, 16>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            ints: Vec::new(),
            strings: Vec::new(),
            push_result: Ok(()),
            pushes: Vec::new(),
        }
    }

    pub fn set_int(&mut self, path: &str, value: Result<i64, RemoteError>) {
        self.ints.retain(|(p, _)| p != path);
        self.ints.push((path_of(path), value)).unwrap();
    }

    pub fn set_string(&mut self, path: &str, value: Result<&str, RemoteError>) {
        let value = value.map(|s| TimeString::try_from(s).unwrap());
        self.strings.retain(|(p, _)| p != path);
        self.strings.push((path_of(path), value)).unwrap();
    }
}

impl RemoteStore for MockRemote {
    async fn get_int(&mut self, path: &str) -> Result<i64, RemoteError> {
        self.ints
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, v)| v.clone())
            .unwrap_or(Err(RemoteError::Connection))
    }

    async fn get_string(&mut self, path: &str) -> Result<TimeString, RemoteError> {
        self.strings
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, v)| v.clone())
            .unwrap_or(Err(RemoteError::Connection))
    }

    async fn push_timestamp(&mut self, path: &str) -> Result<(), RemoteError> {
        self.pushes.push(path_of(path)).unwrap();
        self.push_result.clone()
    }
}

fn path_of(path: &str) -> RemotePath {
    RemotePath::try_from(path).unwrap()
}

/// Calls seen by [`MockStepper`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperEvent {
    Enable,
    Disable,
    Move(i32),
}

/// Stepper that records calls
pub struct MockStepper {
    pub events: Vec<StepperEvent, 128>,
    /// Fail the n-th move (1-based)
    pub fail_on_move: Option<u32>,
    enabled: bool,
    position: i64,
}

impl MockStepper {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            fail_on_move: None,
            enabled: false,
            position: 0,
        }
    }

    pub fn moves(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, StepperEvent::Move(_)))
            .count()
    }
}

impl StepperDriver for MockStepper {
    fn enable_outputs(&mut self) -> Result<(), StepperError> {
        self.events.push(StepperEvent::Enable).unwrap();
        self.enabled = true;
        Ok(())
    }

    fn disable_outputs(&mut self) -> Result<(), StepperError> {
        self.events.push(StepperEvent::Disable).unwrap();
        self.enabled = false;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn move_by(&mut self, steps: i32) -> Result<(), StepperError> {
        if self.fail_on_move == Some(self.moves() as u32 + 1) {
            return Err(StepperError::CommunicationError);
        }
        self.events.push(StepperEvent::Move(steps)).unwrap();
        self.position += steps as i64;
        Ok(())
    }

    fn position(&self) -> i64 {
        self.position
    }
}

/// Delay that only accumulates the requested time
#[derive(Default)]
pub struct MockDelay {
    pub total_ns: u64,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }

    async fn delay_us(&mut self, us: u32) {
        self.total_ns += us as u64 * 1_000;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.total_ns += ms as u64 * 1_000_000;
    }
}

/// Output pin that remembers its level and counts rising edges
#[derive(Default)]
pub struct MockPin {
    high: bool,
    pub rising_edges: u32,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputPin for MockPin {
    fn set_high(&mut self) {
        if !self.high {
            self.rising_edges += 1;
        }
        self.high = true;
    }

    fn set_low(&mut self) {
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

/// Button with a fixed level
pub struct MockButton {
    pub pressed: bool,
}

impl InputPin for MockButton {
    fn is_high(&self) -> bool {
        self.pressed
    }
}

/// Clock stuck at one time of day
pub struct FixedClock {
    hms: ClockString,
}

impl FixedClock {
    pub fn at(hms: &str) -> Self {
        Self {
            hms: ClockString::try_from(hms).unwrap(),
        }
    }
}

impl TimeSource for FixedClock {
    async fn now(&mut self) -> ClockReading {
        ClockReading {
            hms: self.hms.clone(),
            sync: SyncAttempt::Skipped,
        }
    }
}

/// NTP server answering with a fixed Unix time
pub struct MockNtpServer {
    unix: u32,
    pub queries: u32,
    pub fail: Option<NtpError>,
}

impl MockNtpServer {
    pub fn replying(unix: u32) -> Self {
        Self {
            unix,
            queries: 0,
            fail: None,
        }
    }
}

impl NtpTransport for MockNtpServer {
    async fn exchange(
        &mut self,
        _request: &[u8; NTP_PACKET_LEN],
        response: &mut [u8; NTP_PACKET_LEN],
    ) -> Result<usize, NtpError> {
        self.queries += 1;
        if let Some(e) = self.fail {
            return Err(e);
        }
        response.fill(0);
        response[0] = 0b0010_0100;
        response[1] = 2;
        response[40..44].copy_from_slice(&(self.unix + NTP_UNIX_OFFSET).to_be_bytes());
        Ok(NTP_PACKET_LEN)
    }
}
