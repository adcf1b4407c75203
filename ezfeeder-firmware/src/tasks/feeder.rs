//! Feeder task
//!
//! Runs the boot sync once, then polls the schedule and button forever.
//! Every failure is logged and the loop carries on.

use defmt::*;
use embassy_rp::clocks::RoscRng;
use embassy_time::{Delay, Timer};

use ezfeeder_core::app::{BootReport, FeederLoop, TickReport, Trigger};
use ezfeeder_core::config::Slot;
use ezfeeder_core::feeder::FeedReport;
use ezfeeder_core::motion::StepDirStepper;
use ezfeeder_core::store::{LoadFailure, LoadStatus};
use ezfeeder_core::sync::{FieldOutcome, SyncReport};
use ezfeeder_hal_rp2040::flash::Rp2040FlashStorage;
use ezfeeder_hal_rp2040::gpio::{Rp2040Input, Rp2040Output};

use crate::net::{FirebaseClient, NetClock};

/// Motor driver on the board pins
pub type Motor =
    StepDirStepper<Rp2040Output<'static>, Rp2040Output<'static>, Rp2040Output<'static>, Delay>;

/// Concrete feeder application
pub type FeederApp = FeederLoop<
    Rp2040FlashStorage<'static>,
    NetClock,
    Rp2040Input<'static>,
    Motor,
    Delay,
    FirebaseClient<RoscRng>,
>;

/// Feeder task
#[embassy_executor::task]
pub async fn feeder_task(mut app: FeederApp, tick_ms: u32) {
    info!("Feeder task started");

    let boot = app.boot().await;
    log_boot(&boot);

    loop {
        let report = app.tick().await;
        log_tick(&report);
        Timer::after_millis(tick_ms as u64).await;
    }
}

fn log_boot(report: &BootReport) {
    match report.load {
        LoadStatus::Loaded => info!("Stored configuration loaded"),
        LoadStatus::Defaulted(LoadFailure::Missing) => {
            info!("No stored configuration, using defaults")
        }
        LoadStatus::Defaulted(e) => {
            warn!("Failed to read configuration ({:?}), using defaults", e)
        }
    }

    log_sync(&report.sync);

    info!(
        "Configuration: {} portions at {}, {}, {}",
        report.config.portions,
        report.config.slot(Slot::First),
        report.config.slot(Slot::Second),
        report.config.slot(Slot::Third)
    );

    match &report.stored {
        Ok(text) => info!("Stored record: {}", text.as_str()),
        Err(e) => error!("Stored record unreadable: {:?}", e),
    }
}

fn log_sync(report: &SyncReport) {
    match &report.portions {
        FieldOutcome::Updated => debug!("qtdRacao updated"),
        FieldOutcome::Failed(e) => warn!("qtdRacao fetch failed: {}", e.reason()),
    }
    for slot in Slot::ALL {
        match &report.slots[slot.index()] {
            FieldOutcome::Updated => debug!("horario{} updated", slot.index() + 1),
            FieldOutcome::Failed(e) => {
                warn!("horario{} fetch failed: {}", slot.index() + 1, e.reason())
            }
        }
    }

    match report.saved {
        Ok(len) => info!(
            "Configuration saved ({} bytes, {} fields updated)",
            len,
            report.updated_fields()
        ),
        Err(e) => error!("Failed to save configuration: {:?}", e),
    }
}

fn log_tick(report: &TickReport) {
    info!(
        "Current time {} button={} portions={}",
        report.now.hms.as_str(),
        report.button_pressed,
        report.config.portions
    );

    if let LoadStatus::Defaulted(LoadFailure::Unreadable(e)) = report.load {
        warn!("Configuration unreadable ({:?}), using defaults", e);
    }

    for (trigger, feed) in report.feeds.iter() {
        match trigger {
            Trigger::Schedule(slot) => {
                info!("Scheduled feeding (slot {}) at {}", slot.index() + 1, report.now.hms.as_str())
            }
            Trigger::Button => info!("Manual feeding at {}", report.now.hms.as_str()),
        }
        log_feed(feed);
    }
}

fn log_feed(report: &FeedReport) {
    match report.motion {
        Ok(()) => info!("Dispensed {} portions ({} moves)", report.portions, report.moves),
        Err(e) => error!(
            "Motor error after {} moves: {:?}",
            report.moves,
            e
        ),
    }
    match &report.log {
        Ok(()) => debug!("Feeding logged"),
        Err(e) => warn!("Failed to log feeding: {}", e.reason()),
    }
}
