//! Feeder main loop
//!
//! [`FeederLoop`] owns every collaborator the feeder needs and runs one
//! polling step per [`FeederLoop::tick`]:
//!
//! 1. read the local time of day
//! 2. reload the feed config from flash
//! 3. read the manual button
//! 4. feed if the time equals a schedule slot
//! 5. feed if the button is pressed
//!
//! Steps 4 and 5 are independent, so a button press during a scheduled
//! second feeds twice unless [`TriggerPolicy::OncePerTick`] is selected.
//! The caller sleeps between ticks.

use embedded_hal_async::delay::DelayNs;
use ezfeeder_hal::{FlashStorage, InputPin};
use heapless::{String, Vec};

use crate::config::{FeedConfig, FeederSettings, Slot};
use crate::feeder::{FeedController, FeedReport};
use crate::remote::{RemotePaths, RemoteStore};
use crate::store::{ConfigStore, LoadStatus, StoreError, MAX_RECORD_LEN};
use crate::sync::{sync_config, SyncReport};
use crate::time::{ClockReading, TimeSource};
use crate::traits::StepperDriver;

/// How simultaneous triggers combine within one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerPolicy {
    /// Schedule and button each feed
    Independent,
    /// At most one feeding per tick
    OncePerTick,
}

impl TriggerPolicy {
    pub fn from_settings(settings: &FeederSettings) -> Self {
        if settings.single_feed_per_tick {
            TriggerPolicy::OncePerTick
        } else {
            TriggerPolicy::Independent
        }
    }
}

/// What started a feeding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// Time matched a schedule slot
    Schedule(Slot),
    /// Manual button
    Button,
}

/// Outcome of the boot sequence
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootReport {
    /// Whether the stored record was usable
    pub load: LoadStatus,
    /// Remote sync outcome
    pub sync: SyncReport,
    /// Config after sync
    pub config: FeedConfig,
    /// Raw stored record after sync
    pub stored: Result<String<MAX_RECORD_LEN>, StoreError>,
}

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Time reading the schedule was checked against
    pub now: ClockReading,
    /// Config in effect for this tick
    pub config: FeedConfig,
    /// Whether the stored record was usable
    pub load: LoadStatus,
    /// Button level
    pub button_pressed: bool,
    /// Slot equal to the current time, if any
    pub matched_slot: Option<Slot>,
    /// Feedings performed, in order
    pub feeds: Vec<(Trigger, FeedReport), 2>,
}

/// The feeder application state
pub struct FeederLoop<S, C, B, M, D, R> {
    store: ConfigStore<S>,
    clock: C,
    button: B,
    feeder: FeedController<M, D>,
    remote: R,
    paths: RemotePaths,
    policy: TriggerPolicy,
}

impl<S, C, B, M, D, R> FeederLoop<S, C, B, M, D, R>
where
    S: FlashStorage,
    C: TimeSource,
    B: InputPin,
    M: StepperDriver,
    D: DelayNs,
    R: RemoteStore,
{
    pub fn new(
        store: ConfigStore<S>,
        clock: C,
        button: B,
        feeder: FeedController<M, D>,
        remote: R,
        paths: RemotePaths,
        policy: TriggerPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            button,
            feeder,
            remote,
            paths,
            policy,
        }
    }

    /// Config store access
    pub fn store_mut(&mut self) -> &mut ConfigStore<S> {
        &mut self.store
    }

    /// Feed controller access
    pub fn feeder(&self) -> &FeedController<M, D> {
        &self.feeder
    }

    /// Remote store access
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Load the stored config, refresh it from the remote store and read
    /// back what was written
    pub async fn boot(&mut self) -> BootReport {
        let (mut config, load) = self.store.load_with_status().await;
        let sync = sync_config(&mut self.remote, &self.paths, &mut self.store, &mut config).await;
        let stored = self.store.dump().await;

        BootReport {
            load,
            sync,
            config,
            stored,
        }
    }

    /// Run one polling step
    pub async fn tick(&mut self) -> TickReport {
        let now = self.clock.now().await;
        let (config, load) = self.store.load_with_status().await;
        let button_pressed = self.button.is_high();
        let matched_slot = config.matching_slot(now.hms.as_str());

        let mut feeds = Vec::new();

        if let Some(slot) = matched_slot {
            let report = self.feed(config.portions).await;
            let _ = feeds.push((Trigger::Schedule(slot), report));
        }

        let already_fed = !feeds.is_empty();
        if button_pressed && !(self.policy == TriggerPolicy::OncePerTick && already_fed) {
            let report = self.feed(config.portions).await;
            let _ = feeds.push((Trigger::Button, report));
        }

        TickReport {
            now,
            config,
            load,
            button_pressed,
            matched_slot,
            feeds,
        }
    }

    async fn feed(&mut self, portions: u16) -> FeedReport {
        self.feeder
            .feed(portions, &mut self.remote, self.paths.log.as_str())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedClock, MemFlash, MockButton, MockDelay, MockRemote, MockStepper};
    use embassy_futures::block_on;

    type TestLoop = FeederLoop<MemFlash, FixedClock, MockButton, MockStepper, MockDelay, MockRemote>;

    fn feeder_loop(now: &str, pressed: bool, policy: TriggerPolicy) -> TestLoop {
        FeederLoop::new(
            ConfigStore::new(MemFlash::new()),
            FixedClock::at(now),
            MockButton { pressed },
            FeedController::new(MockStepper::new(), MockDelay::new()),
            MockRemote::new(),
            RemotePaths::for_user("u1").unwrap(),
            policy,
        )
    }

    #[test]
    fn test_policy_from_settings() {
        let mut settings = FeederSettings::default();
        assert_eq!(
            TriggerPolicy::from_settings(&settings),
            TriggerPolicy::Independent
        );
        settings.single_feed_per_tick = true;
        assert_eq!(
            TriggerPolicy::from_settings(&settings),
            TriggerPolicy::OncePerTick
        );
    }

    #[test]
    fn test_schedule_match_feeds() {
        let mut app = feeder_loop("14:00:00", false, TriggerPolicy::Independent);
        let report = block_on(app.tick());

        assert_eq!(report.matched_slot, Some(Slot::Second));
        assert_eq!(report.feeds.len(), 1);
        let (trigger, feed) = &report.feeds[0];
        assert_eq!(*trigger, Trigger::Schedule(Slot::Second));
        assert_eq!(feed.portions, 2);
        assert_eq!(feed.moves, 8);
        assert_eq!(app.remote().pushes.len(), 1);
    }

    #[test]
    fn test_no_match_does_nothing() {
        let mut app = feeder_loop("14:00:01", false, TriggerPolicy::Independent);
        let report = block_on(app.tick());

        assert_eq!(report.matched_slot, None);
        assert!(report.feeds.is_empty());
        assert!(app.feeder().motor().events.is_empty());
        assert!(app.remote().pushes.is_empty());
    }

    #[test]
    fn test_button_feeds() {
        let mut app = feeder_loop("03:15:00", true, TriggerPolicy::Independent);
        let report = block_on(app.tick());

        assert_eq!(report.feeds.len(), 1);
        assert_eq!(report.feeds[0].0, Trigger::Button);
    }

    #[test]
    fn test_double_trigger_feeds_twice() {
        let mut app = feeder_loop("08:00:00", true, TriggerPolicy::Independent);
        let report = block_on(app.tick());

        assert_eq!(report.feeds.len(), 2);
        assert_eq!(report.feeds[0].0, Trigger::Schedule(Slot::First));
        assert_eq!(report.feeds[1].0, Trigger::Button);
        assert_eq!(app.feeder().motor().moves(), 16);
        assert_eq!(app.remote().pushes.len(), 2);
    }

    #[test]
    fn test_once_per_tick_collapses_triggers() {
        let mut app = feeder_loop("08:00:00", true, TriggerPolicy::OncePerTick);
        let report = block_on(app.tick());

        assert_eq!(report.feeds.len(), 1);
        assert_eq!(report.feeds[0].0, Trigger::Schedule(Slot::First));
        assert_eq!(app.remote().pushes.len(), 1);
    }

    #[test]
    fn test_tick_reloads_config() {
        let mut app = feeder_loop("09:10:11", false, TriggerPolicy::Independent);
        let report = block_on(app.tick());
        assert!(report.feeds.is_empty());

        let mut config = FeedConfig::default();
        config.portions = 1;
        config.first.clear();
        let _ = config.first.push_str("09:10:11");
        block_on(app.store_mut().save(&config)).unwrap();

        let report = block_on(app.tick());
        assert_eq!(report.load, LoadStatus::Loaded);
        assert_eq!(report.feeds.len(), 1);
        assert_eq!(report.feeds[0].1.moves, 4);
    }

    #[test]
    fn test_boot_syncs_and_persists() {
        let mut app = feeder_loop("00:00:00", false, TriggerPolicy::Independent);
        app.remote.set_int("/users/u1/qtdRacao", Ok(250));
        app.remote.set_string("/users/u1/horario1", Ok("06:00:00"));

        let report = block_on(app.boot());

        assert!(matches!(report.load, LoadStatus::Defaulted(_)));
        assert_eq!(report.sync.updated_fields(), 2);
        assert_eq!(report.config.portions, 5);
        assert_eq!(report.config.slot(Slot::First), "06:00:00");
        assert_eq!(report.config.slot(Slot::Second), "14:00:00");

        let stored = report.stored.unwrap();
        assert!(stored.starts_with(r#"{"qtdPorcPadrao":5,"hrPorc1":"06:00:00""#));
        assert_eq!(block_on(app.store_mut().load()), report.config);
    }
}
