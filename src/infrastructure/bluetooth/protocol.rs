//! iLink Lamp Protocol
//!
//! Packet layout and checksum for the Jieli-based lamp firmware.
//!
//! ```text
//! [0-1]   : Header 0x55 0xAA
//! [2]     : Mode (0x01 system, 0x03 colour)
//! [3..n]  : Payload
//! [n]     : Checksum, 0xFF - (sum of all preceding bytes mod 256)
//! ```
//!
//! The checksum makes the byte sum of the whole packet congruent to 0xFF
//! mod 256. It is not a CRC despite the vendor naming.

use crate::domain::error::DispatchError;
use crate::domain::models::{decode_hex, Command};

/// Fixed two-byte packet header
pub const HEADER: [u8; 2] = [0x55, 0xAA];

/// Smallest valid packet: header, mode and checksum
pub const MIN_PACKET_LEN: usize = HEADER.len() + 2;

/// Lamp command characteristic UUID
pub const CHAR_UUID: &str = "0000a040-0000-1000-8000-00805f9b34fb";

/// Lamp Bluetooth address
pub const DEVICE_ADDRESS: &str = "A8:D2:CD:C7:9C:AC";

/// Build a packet from hex mode and body, e.g. `encode("01", "080501")`
pub fn encode(mode: &str, body: &str) -> Result<Vec<u8>, DispatchError> {
    let command = Command::from_hex(mode, body, false)?;
    Ok(frame(&command))
}

/// Frame an already validated command
pub fn frame(command: &Command) -> Vec<u8> {
    let mut packet = Vec::with_capacity(MIN_PACKET_LEN + command.body().len());
    packet.extend_from_slice(&HEADER);
    packet.push(command.mode());
    packet.extend_from_slice(command.body());
    packet.push(checksum(&packet));
    packet
}

/// Checksum over every byte of `bytes`
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    0xFF - sum
}

/// Recompute the trailing checksum byte and compare
pub fn validate(packet: &[u8]) -> bool {
    match packet.split_last() {
        Some((crc, rest)) if !rest.is_empty() => checksum(rest) == *crc,
        _ => false,
    }
}

/// Split a received packet back into a command, if it is well formed
pub fn decode(packet: &[u8]) -> Option<Command> {
    if packet.len() < MIN_PACKET_LEN || !packet.starts_with(&HEADER) || !validate(packet) {
        return None;
    }
    let mode = packet[HEADER.len()];
    let body = &packet[HEADER.len() + 1..packet.len() - 1];
    Some(Command::new(mode, body.to_vec()))
}

/// Hex dump used in trace logs
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_packets() {
        assert_eq!(
            encode("01", "080501").unwrap(),
            vec![0x55, 0xAA, 0x01, 0x08, 0x05, 0x01, 0xF1]
        );
        assert_eq!(
            encode("01", "0801ff").unwrap(),
            vec![0x55, 0xAA, 0x01, 0x08, 0x01, 0xFF, 0xF7]
        );
        assert_eq!(
            frame(&Command::power(false)),
            vec![0x55, 0xAA, 0x01, 0x08, 0x05, 0x00, 0xF2]
        );
        assert_eq!(
            frame(&Command::color(0, 255, 0)),
            vec![0x55, 0xAA, 0x03, 0x08, 0x02, 0x00, 0xFF, 0x00, 0xF4]
        );
    }

    #[test]
    fn test_encoded_packets_validate() {
        let bodies = ["080501", "080500", "080903", "080100", "0801ff", "0802000000", "0802ffffff", ""];
        for mode in ["01", "03", "ff"] {
            for body in bodies {
                let packet = encode(mode, body).unwrap();
                assert!(validate(&packet), "{} {}", mode, body);
                assert_eq!(encode(mode, body).unwrap(), packet);
            }
        }
    }

    #[test]
    fn test_validate_rejects_corruption() {
        let mut packet = encode("03", "0802102030").unwrap();
        packet[4] ^= 0x01;
        assert!(!validate(&packet));
        assert!(!validate(&[]));
        assert!(!validate(&[0xFF]));
    }

    #[test]
    fn test_encode_rejects_bad_hex() {
        assert!(matches!(encode("0g", "080501"), Err(DispatchError::MalformedInput(_))));
        assert!(matches!(encode("01", "08051"), Err(DispatchError::MalformedInput(_))));
    }

    #[test]
    fn test_decode() {
        let packet = frame(&Command::brightness(0x40));
        assert_eq!(decode(&packet), Some(Command::brightness(0x40)));

        let mut bad_header = packet.clone();
        bad_header[0] = 0x00;
        assert_eq!(decode(&bad_header), None);
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(to_hex(&[0x55, 0xAA, 0x01]), "55 AA 01");
    }
}
