//! Additive checksum over the packet body.
//!
//! The checksum is the plain byte sum of everything from the protocol type
//! tag through the last parameter byte, truncated to 16 bits and sent
//! little-endian as the last two bytes of the packet.

use crate::constants::{CHECKSUM_REGION_START, CHECKSUM_SIZE};
use crate::error::DecodeError;

/// Compute the 16-bit wrapping byte sum of `region`.
pub fn compute_checksum(region: &[u8]) -> u16 {
    region
        .iter()
        .fold(0u16, |acc, &byte| acc.wrapping_add(u16::from(byte)))
}

/// Verify a complete packet against its little-endian trailer.
///
/// Returns the checksum on success. A packet too short to carry a trailer
/// after the start marker is `TooShort`; a mismatch is `ChecksumInvalid`.
pub fn verify_checksum(packet: &[u8]) -> Result<u16, DecodeError> {
    let min_len = CHECKSUM_REGION_START + CHECKSUM_SIZE;
    if packet.len() < min_len {
        return Err(DecodeError::TooShort {
            expected: min_len,
            actual: packet.len(),
        });
    }
    let region_end = packet.len() - CHECKSUM_SIZE;
    let expected = compute_checksum(&packet[CHECKSUM_REGION_START..region_end]);
    let actual = u16::from_le_bytes([packet[region_end], packet[region_end + 1]]);
    if expected == actual {
        Ok(expected)
    } else {
        Err(DecodeError::ChecksumInvalid { expected, actual })
    }
}
