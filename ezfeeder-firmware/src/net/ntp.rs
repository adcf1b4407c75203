//! SNTP over UDP

use defmt::*;
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::Stack;
use embassy_time::{with_timeout, Duration, Instant};
use heapless::String;

use ezfeeder_core::config::MAX_HOST_LEN;
use ezfeeder_core::time::ntp::{NtpError, NTP_PACKET_LEN, NTP_PORT};
use ezfeeder_core::time::{ClockReading, NtpClock, NtpTransport, SyncAttempt, TimeSource};

/// Reply timeout
const NTP_TIMEOUT: Duration = Duration::from_secs(2);

/// UDP exchange with the configured NTP server
pub struct UdpNtpTransport {
    stack: Stack<'static>,
    server: String<MAX_HOST_LEN>,
}

impl UdpNtpTransport {
    pub fn new(stack: Stack<'static>, server: String<MAX_HOST_LEN>) -> Self {
        Self { stack, server }
    }
}

impl NtpTransport for UdpNtpTransport {
    async fn exchange(
        &mut self,
        request: &[u8; NTP_PACKET_LEN],
        response: &mut [u8; NTP_PACKET_LEN],
    ) -> Result<usize, NtpError> {
        let addrs = self
            .stack
            .dns_query(self.server.as_str(), DnsQueryType::A)
            .await
            .map_err(|_| NtpError::Dns)?;
        let addr = *addrs.first().ok_or(NtpError::Dns)?;

        let mut rx_meta = [PacketMetadata::EMPTY; 1];
        let mut rx_buffer = [0u8; 64];
        let mut tx_meta = [PacketMetadata::EMPTY; 1];
        let mut tx_buffer = [0u8; 64];
        let mut socket = UdpSocket::new(
            self.stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| NtpError::Io)?;

        socket
            .send_to(request, (addr, NTP_PORT))
            .await
            .map_err(|_| NtpError::Io)?;

        let (len, _) = with_timeout(NTP_TIMEOUT, socket.recv_from(response))
            .await
            .map_err(|_| NtpError::Timeout)?
            .map_err(|_| NtpError::Io)?;

        Ok(len)
    }
}

/// Wall clock for the feeder loop
pub struct NetClock {
    clock: NtpClock<UdpNtpTransport>,
}

impl NetClock {
    pub fn new(clock: NtpClock<UdpNtpTransport>) -> Self {
        Self { clock }
    }
}

impl TimeSource for NetClock {
    async fn now(&mut self) -> ClockReading {
        let reading = self.clock.read(Instant::now().as_millis()).await;
        match reading.sync {
            SyncAttempt::Synced => debug!("NTP sync ok: {}", reading.hms.as_str()),
            SyncAttempt::Failed(e) => warn!("NTP sync failed: {:?}", e),
            SyncAttempt::Skipped => {}
        }
        reading
    }
}
