//! EZFeeder - Pet Feeder Firmware
//!
//! Main firmware binary for the Raspberry Pi Pico W. Joins Wi-Fi, syncs
//! the feeding schedule from the remote database and dispenses food on
//! schedule or on a button press.

#![no_std]
#![no_main]

use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::{TcpClient, TcpClientState};
use embassy_net::StackResources;
use embassy_rp::bind_interrupts;
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output, Pull};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_time::{Delay, Duration, Timer};
use rand_core::RngCore;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use ezfeeder_core::app::{FeederLoop, TriggerPolicy};
use ezfeeder_core::feeder::FeedController;
use ezfeeder_core::motion::{RampConfig, StepDirStepper};
use ezfeeder_core::remote::RemotePaths;
use ezfeeder_core::store::ConfigStore;
use ezfeeder_core::time::{ClockState, NtpClock};
use ezfeeder_hal_rp2040::flash::Rp2040FlashStorage;
use ezfeeder_hal_rp2040::gpio::{Rp2040Input, Rp2040Output};

use crate::config::load_settings;
use crate::net::firebase::{FirebaseBuffers, Tcp};
use crate::net::{join_forever, FirebaseClient, NetClock, UdpNtpTransport};

mod config;
mod net;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

/// CYW43 firmware blobs, flashed separately:
///
/// ```text
/// probe-rs download 43439A0.bin --binary-format bin --chip RP2040 --base-address 0x10100000
/// probe-rs download 43439A0_clm.bin --binary-format bin --chip RP2040 --base-address 0x10140000
/// ```
const CYW43_FW_ADDR: usize = 0x1010_0000;
const CYW43_FW_LEN: usize = 230_321;
const CYW43_CLM_ADDR: usize = 0x1014_0000;
const CYW43_CLM_LEN: usize = 4_752;

// Static cells for state that must live forever
static CYW43_STATE: StaticCell<cyw43::State> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<5>> = StaticCell::new();
static TCP_STATE: StaticCell<TcpClientState<1, 4096, 4096>> = StaticCell::new();
static TCP_CLIENT: StaticCell<Tcp> = StaticCell::new();
static DNS_SOCKET: StaticCell<DnsSocket<'static>> = StaticCell::new();
static HTTP_BUFFERS: StaticCell<FirebaseBuffers> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("EZFeeder firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Load device settings from flash (or use embedded defaults)
    let flash = Rp2040FlashStorage::new(p.FLASH, p.DMA_CH2);
    let (flash, settings) = load_settings(flash).await;
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("No usable device settings: {:?}", e);
            halt().await
        }
    };

    let paths = match RemotePaths::for_user(settings.remote.user.as_str()) {
        Ok(paths) => paths,
        Err(e) => {
            error!("Remote user id unusable: {}", e.reason());
            halt().await
        }
    };

    let ramp = match RampConfig::from_settings(&settings.motor) {
        Ok(ramp) => ramp,
        Err(e) => {
            error!("Invalid motor settings: {:?}", e);
            halt().await
        }
    };

    // Pico W pins: STEP=GPIO18, DIR=GPIO19, ENABLE=GPIO5 (active low)
    let stepper = StepDirStepper::new(
        Rp2040Output::new(p.PIN_18, false),
        Rp2040Output::new(p.PIN_19, false),
        Rp2040Output::new(p.PIN_5, true),
        Delay,
        ramp,
    );
    // BUTTON=GPIO15 (active high)
    let button = Rp2040Input::new(p.PIN_15, Pull::Down);
    info!("Motor and button initialized");

    // CYW43 radio over PIO SPI
    let (fw, clm) = unsafe {
        (
            core::slice::from_raw_parts(CYW43_FW_ADDR as *const u8, CYW43_FW_LEN),
            core::slice::from_raw_parts(CYW43_CLM_ADDR as *const u8, CYW43_CLM_LEN),
        )
    };

    let pwr = Output::new(p.PIN_23, Level::Low);
    let cs = Output::new(p.PIN_25, Level::High);
    let mut pio = Pio::new(p.PIO0, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        p.PIN_24,
        p.PIN_29,
        p.DMA_CH0,
    );

    let state = CYW43_STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    spawner.spawn(tasks::cyw43_task(runner)).unwrap();

    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;
    info!("Wi-Fi radio initialized");

    // Network stack with DHCP
    let mut rng = RoscRng;
    let net_config = embassy_net::Config::dhcpv4(Default::default());
    let (stack, net_runner) = embassy_net::new(
        net_device,
        net_config,
        NET_RESOURCES.init(StackResources::new()),
        rng.next_u64(),
    );
    spawner.spawn(tasks::net_task(net_runner)).unwrap();

    join_forever(&mut control, stack, &settings.wifi).await;

    // Remote store client
    let tcp_state = TCP_STATE.init(TcpClientState::new());
    let tcp = TCP_CLIENT.init(TcpClient::new(stack, tcp_state));
    tcp.set_timeout(Some(Duration::from_secs(10)));
    let dns = DNS_SOCKET.init(DnsSocket::new(stack));
    let remote = FirebaseClient::new(
        tcp,
        dns,
        HTTP_BUFFERS.init_with(FirebaseBuffers::new),
        settings.remote.clone(),
        RoscRng,
    );

    // Network clock
    let clock = NetClock::new(NtpClock::new(
        UdpNtpTransport::new(stack, settings.ntp.server.clone()),
        ClockState::from_settings(&settings.ntp),
    ));

    let app = FeederLoop::new(
        ConfigStore::new(flash),
        clock,
        button,
        FeedController::new(stepper, Delay),
        remote,
        paths,
        TriggerPolicy::from_settings(&settings.feeder),
    );

    spawner
        .spawn(tasks::feeder_task(app, settings.feeder.tick_ms))
        .unwrap();

    info!("All tasks spawned, firmware running");
}

/// Park the firmware after a fatal configuration error
async fn halt() -> ! {
    loop {
        Timer::after_secs(60).await;
        error!("Halted: fix the device settings and reset");
    }
}
