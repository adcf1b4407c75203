//! Feed configuration record
//!
//! The only persisted application entity: a portion count and three
//! scheduled feeding times. It is stored in flash as a compact JSON object
//! using the same field names as the remote database client.

use heapless::String;
use serde::{Deserialize, Serialize};

/// Maximum length of a schedule time string
///
/// Valid times are `HH:MM:SS` (8 bytes). Longer strings are tolerated so a
/// malformed remote value still round-trips through flash.
pub const MAX_TIME_LEN: usize = 32;

/// Number of schedule slots
pub const SLOT_COUNT: usize = 3;

/// Portion count used when the record has none
pub const DEFAULT_PORTIONS: u16 = 2;

/// Slot times used when the record has none
pub const DEFAULT_SLOT_TIMES: [&str; SLOT_COUNT] = ["08:00:00", "14:00:00", "20:00:00"];

/// Remote portion quantity per dispensed portion
pub const UNITS_PER_PORTION: i64 = 50;

/// Schedule time string as stored
pub type TimeString = String<MAX_TIME_LEN>;

/// One of the three schedule slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    First,
    Second,
    Third,
}

impl Slot {
    /// All slots in order
    pub const ALL: [Slot; SLOT_COUNT] = [Slot::First, Slot::Second, Slot::Third];

    /// Zero-based slot index
    pub fn index(self) -> usize {
        match self {
            Slot::First => 0,
            Slot::Second => 1,
            Slot::Third => 2,
        }
    }

    /// Default time for this slot
    pub fn default_time(self) -> TimeString {
        time_string(DEFAULT_SLOT_TIMES[self.index()])
    }
}

/// Feeding schedule and portion size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedConfig {
    /// Portions dispensed per feeding event
    #[serde(rename = "qtdPorcPadrao", default = "default_portions")]
    pub portions: u16,
    /// First scheduled time
    #[serde(rename = "hrPorc1", default = "default_first")]
    pub first: TimeString,
    /// Second scheduled time
    #[serde(rename = "hrPorc2", default = "default_second")]
    pub second: TimeString,
    /// Third scheduled time
    #[serde(rename = "hrPorc3", default = "default_third")]
    pub third: TimeString,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            portions: DEFAULT_PORTIONS,
            first: Slot::First.default_time(),
            second: Slot::Second.default_time(),
            third: Slot::Third.default_time(),
        }
    }
}

impl FeedConfig {
    /// Get the time stored in a slot
    pub fn slot(&self, slot: Slot) -> &str {
        match slot {
            Slot::First => self.first.as_str(),
            Slot::Second => self.second.as_str(),
            Slot::Third => self.third.as_str(),
        }
    }

    /// Get mutable access to a slot
    pub fn slot_mut(&mut self, slot: Slot) -> &mut TimeString {
        match slot {
            Slot::First => &mut self.first,
            Slot::Second => &mut self.second,
            Slot::Third => &mut self.third,
        }
    }

    /// Decode a stored JSON record field by field
    ///
    /// Returns `None` unless `json` is a JSON object. A field that is absent,
    /// `null` or of the wrong type takes its default without affecting the
    /// other fields.
    pub fn from_json(json: &[u8]) -> Option<Self> {
        serde_json_core::from_slice::<RecordShape>(json).ok()?;

        let mut config = Self::default();
        if let Some(portions) = field::<PortionsField>(json).and_then(|f| f.value) {
            config.portions = portions;
        }
        if let Some(time) = field::<FirstField>(json).and_then(|f| f.value) {
            config.first = time;
        }
        if let Some(time) = field::<SecondField>(json).and_then(|f| f.value) {
            config.second = time;
        }
        if let Some(time) = field::<ThirdField>(json).and_then(|f| f.value) {
            config.third = time;
        }
        Some(config)
    }

    /// First slot whose time string equals `now` exactly
    ///
    /// No parsing or tolerance: a malformed slot simply never matches.
    pub fn matching_slot(&self, now: &str) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| self.slot(*slot) == now)
    }
}

/// Convert a raw remote portion quantity to a portion count
///
/// Integer division truncates toward zero; negative quantities dispense
/// nothing.
pub fn portions_from_remote(raw: i64) -> u16 {
    (raw / UNITS_PER_PORTION).clamp(0, u16::MAX as i64) as u16
}

const _: () = {
    let mut i = 0;
    while i < SLOT_COUNT {
        assert!(DEFAULT_SLOT_TIMES[i].len() <= MAX_TIME_LEN);
        i += 1;
    }
};

fn time_string(s: &str) -> TimeString {
    TimeString::try_from(s).unwrap_or_default()
}

/// Any JSON object, fields ignored
#[derive(Deserialize)]
struct RecordShape {}

// One struct per field so a bad value only fails its own decode
#[derive(Deserialize)]
struct PortionsField {
    #[serde(rename = "qtdPorcPadrao")]
    value: Option<u16>,
}

#[derive(Deserialize)]
struct FirstField {
    #[serde(rename = "hrPorc1")]
    value: Option<TimeString>,
}

#[derive(Deserialize)]
struct SecondField {
    #[serde(rename = "hrPorc2")]
    value: Option<TimeString>,
}

#[derive(Deserialize)]
struct ThirdField {
    #[serde(rename = "hrPorc3")]
    value: Option<TimeString>,
}

fn field<'de, T: Deserialize<'de>>(json: &'de [u8]) -> Option<T> {
    serde_json_core::from_slice::<T>(json).ok().map(|(f, _)| f)
}

fn default_portions() -> u16 {
    DEFAULT_PORTIONS
}

fn default_first() -> TimeString {
    Slot::First.default_time()
}

fn default_second() -> TimeString {
    Slot::Second.default_time()
}

fn default_third() -> TimeString {
    Slot::Third.default_time()
}
