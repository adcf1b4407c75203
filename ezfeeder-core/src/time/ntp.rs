//! SNTP packet codec
//!
//! Client requests are 48-byte SNTPv4 packets sent to UDP port 123. Only the
//! transmit timestamp of the reply is used; the round-trip delay is ignored
//! since the clock resolution that matters is one second.

/// NTP packet length
pub const NTP_PACKET_LEN: usize = 48;

/// NTP server port
pub const NTP_PORT: u16 = 123;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970)
pub const NTP_UNIX_OFFSET: u32 = 2_208_988_800;

/// Offset of the transmit timestamp seconds in the packet
const TRANSMIT_SECONDS: usize = 40;

/// LI = 3 (unsynchronized), version 4, mode 3 (client)
const CLIENT_HEADER: u8 = 0b1110_0011;

/// Server mode
const MODE_SERVER: u8 = 4;

/// NTP client errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NtpError {
    /// Server name did not resolve
    Dns,
    /// Socket send or receive failed
    Io,
    /// No reply in time
    Timeout,
    /// Reply shorter than an NTP packet
    ShortPacket,
    /// Reply is not a server-mode packet
    InvalidMode,
    /// Kiss-of-death reply (stratum 0)
    KissOfDeath,
    /// Transmit timestamp is before the Unix epoch
    InvalidTimestamp,
}

/// Build a client request packet
pub fn request_packet() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = CLIENT_HEADER;
    // Stratum 0, poll interval 2^6 s, precision 2^-20 s
    packet[1] = 0;
    packet[2] = 6;
    packet[3] = 0xEC;
    // Reference id "1N14"
    packet[12] = 49;
    packet[13] = 0x4E;
    packet[14] = 49;
    packet[15] = 52;
    packet
}

/// Decode a server reply into Unix seconds
pub fn parse_response(packet: &[u8]) -> Result<u32, NtpError> {
    if packet.len() < NTP_PACKET_LEN {
        return Err(NtpError::ShortPacket);
    }
    if packet[0] & 0b111 != MODE_SERVER {
        return Err(NtpError::InvalidMode);
    }
    if packet[1] == 0 {
        return Err(NtpError::KissOfDeath);
    }

    let seconds = u32::from_be_bytes([
        packet[TRANSMIT_SECONDS],
        packet[TRANSMIT_SECONDS + 1],
        packet[TRANSMIT_SECONDS + 2],
        packet[TRANSMIT_SECONDS + 3],
    ]);

    seconds
        .checked_sub(NTP_UNIX_OFFSET)
        .ok_or(NtpError::InvalidTimestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(seconds: u32) -> [u8; NTP_PACKET_LEN] {
        let mut packet = [0u8; NTP_PACKET_LEN];
        // LI 0, version 4, mode 4
        packet[0] = 0b0010_0100;
        packet[1] = 2;
        packet[40..44].copy_from_slice(&seconds.to_be_bytes());
        packet
    }

    #[test]
    fn test_request_packet() {
        let packet = request_packet();
        assert_eq!(packet.len(), 48);
        assert_eq!(packet[0], 0xE3);
        assert_eq!(packet[2], 6);
        assert_eq!(packet[3], 0xEC);
        assert_eq!(&packet[12..16], b"1N14");
        assert!(packet[16..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_parse_response() {
        let unix = 1_704_106_800u32;
        assert_eq!(parse_response(&reply(unix + NTP_UNIX_OFFSET)), Ok(unix));
    }

    #[test]
    fn test_reject_bad_replies() {
        assert_eq!(parse_response(&[0u8; 20]), Err(NtpError::ShortPacket));

        let mut packet = reply(NTP_UNIX_OFFSET + 1);
        packet[0] = CLIENT_HEADER;
        assert_eq!(parse_response(&packet), Err(NtpError::InvalidMode));

        let mut packet = reply(NTP_UNIX_OFFSET + 1);
        packet[1] = 0;
        assert_eq!(parse_response(&packet), Err(NtpError::KissOfDeath));

        assert_eq!(parse_response(&reply(5)), Err(NtpError::InvalidTimestamp));
    }
}
