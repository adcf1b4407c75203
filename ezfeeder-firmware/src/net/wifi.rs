//! Wi-Fi station join

use cyw43::{Control, JoinOptions};
use defmt::*;
use embassy_net::Stack;
use embassy_time::Timer;

use ezfeeder_core::config::WifiSettings;

/// Delay between join attempts
const JOIN_RETRY_MS: u64 = 500;

/// Join the configured network, retrying until it succeeds, then wait for
/// a DHCP lease
pub async fn join_forever(control: &mut Control<'_>, stack: Stack<'_>, wifi: &WifiSettings) {
    info!("Connecting to Wi-Fi network {}", wifi.ssid.as_str());

    let mut attempts: u32 = 0;
    loop {
        let options = if wifi.password.is_empty() {
            JoinOptions::new_open()
        } else {
            JoinOptions::new(wifi.password.as_bytes())
        };

        match control.join(wifi.ssid.as_str(), options).await {
            Ok(()) => break,
            Err(e) => {
                attempts += 1;
                debug!("Join attempt {} failed: status {}", attempts, e.status);
                Timer::after_millis(JOIN_RETRY_MS).await;
            }
        }
    }

    info!("Wi-Fi joined, waiting for DHCP");
    stack.wait_link_up().await;
    stack.wait_config_up().await;

    if let Some(config) = stack.config_v4() {
        info!("Connected with IP {}", config.address);
    }
}
