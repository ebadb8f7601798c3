//! Packet encoding and decoding.
//!
//! ## Packet Format
//!
//! | Field         | Size (bytes) | Description                                        |
//! |---------------|--------------|----------------------------------------------------|
//! | start         | 2            | `FD FD`                                            |
//! | protocol type | 1            | `02`                                               |
//! | id_len        | 1            | Length of the device id.                           |
//! | device id     | id_len       | ASCII device identifier.                           |
//! | pw_len        | 1            | Length of the password.                            |
//! | password      | pw_len       | ASCII password.                                    |
//! | function      | 1            | `01` read, `03` write, `06` response.              |
//! | parameters    | variable     | Plain `id value` pairs and marker entries.         |
//! | checksum      | 2            | Byte sum from protocol type to last parameter, LE. |
//!
//! Commands only ever carry plain pairs. Replies may interleave marker entries:
//!
//! | Marker          | Byte | Layout                      |
//! |-----------------|------|-----------------------------|
//! | PAGE            | `FF` | `FF page`                   |
//! | FUNC            | `FC` | `FC func`                   |
//! | SIZE            | `FE` | `FE size id data[size]`     |
//! | NOT_SUPPORTED   | `FD` | `FD id`                     |

use bytes::BufMut;
use log::{debug, warn};

use crate::checksum::{compute_checksum, verify_checksum};
use crate::constants::*;
use crate::error::{CredentialField, DecodeError, EncodingError};
use crate::params::{interpret, ParsedParameters};
use crate::types::{check_credential_len, Function, ParameterList};

// ============================================================================
// Encoding
// ============================================================================

/// Encode a command packet.
///
/// Fails only if a credential is longer than 255 bytes; nothing is produced
/// in that case.
pub fn encode_packet(
    function: u8,
    params: &ParameterList,
    device_id: &[u8],
    password: &[u8],
) -> Result<Vec<u8>, EncodingError> {
    check_credential_len(CredentialField::DeviceId, device_id)?;
    check_credential_len(CredentialField::Password, password)?;
    Ok(build_packet(function, params, device_id, password))
}

/// Lay out the packet. Credential lengths must already be checked.
pub(crate) fn build_packet(
    function: u8,
    params: &ParameterList,
    device_id: &[u8],
    password: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(
        START_MARKER.len() + 4 + device_id.len() + password.len() + params.len() * 2 + CHECKSUM_SIZE,
    );

    // 1. Start marker and protocol type
    buf.extend_from_slice(&START_MARKER);
    buf.push(PROTOCOL_TYPE);

    // 2. Credentials, each with a one-byte length prefix
    buf.push(device_id.len() as u8);
    buf.extend_from_slice(device_id);
    buf.push(password.len() as u8);
    buf.extend_from_slice(password);

    // 3. Function code
    buf.push(function);

    // 4. Parameter pairs
    for (id, value) in params.iter() {
        if is_marker(id) {
            warn!(
                "parameter id 0x{:02X} collides with a reply marker and will not decode as a plain pair",
                id
            );
        }
        buf.push(id);
        buf.push(value);
    }

    // 5. Checksum over everything after the start marker
    let checksum = compute_checksum(&buf[CHECKSUM_REGION_START..]);
    buf.put_u16_le(checksum);

    buf
}

// ============================================================================
// Decoding
// ============================================================================

/// One entry of a reply's parameter region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterEntry {
    /// Plain `id value` pair.
    Value {
        /// Parameter id.
        id: u8,
        /// Raw value byte.
        value: u8,
    },
    /// SIZE block: variable-length raw value.
    Block {
        /// Parameter id.
        id: u8,
        /// Raw data bytes.
        data: Vec<u8>,
    },
    /// PAGE marker with the page that follows, if present.
    Page(Option<u8>),
    /// FUNC marker with the function that follows, if present.
    Function(Option<u8>),
    /// NOT_SUPPORTED marker with the rejected id, if present.
    NotSupported(Option<u8>),
}

/// Header fields of a decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    /// Device id echoed by the unit.
    pub device_id: Vec<u8>,
    /// Password echoed by the unit.
    pub password: Vec<u8>,
    /// Function code.
    pub function: Function,
}

/// Result of decoding a reply.
///
/// Decoding never fails outright. `header` is set once the header parsed,
/// `entries` holds every parameter entry read before decoding stopped, and
/// `error` carries the reason decoding stopped early, if it did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedPacket {
    /// Parsed header, if the packet got that far.
    pub header: Option<PacketHeader>,
    /// Parameter entries in wire order.
    pub entries: Vec<ParameterEntry>,
    /// Diagnostic, if decoding stopped early.
    pub error: Option<DecodeError>,
}

impl DecodedPacket {
    fn failed(error: DecodeError) -> Self {
        warn!("{}", error);
        DecodedPacket {
            header: None,
            entries: Vec::new(),
            error: Some(error),
        }
    }

    /// Returns true if the whole packet decoded without a diagnostic.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Plain `(id, value)` pairs, skipping markers and blocks.
    pub fn values(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            ParameterEntry::Value { id, value } => Some((*id, *value)),
            _ => None,
        })
    }

    /// Interpret the collected entries.
    pub fn parameters(&self) -> ParsedParameters {
        interpret(&self.entries)
    }
}

/// Decode a reply packet.
///
/// Validation stops at the first structural problem and returns an empty
/// result with the diagnostic. A truncated SIZE block stops the parameter
/// walk but keeps everything read before it.
pub fn decode_packet(data: &[u8]) -> DecodedPacket {
    let len = data.len();

    // 1. Minimum size
    if len < MIN_PACKET_SIZE {
        return DecodedPacket::failed(DecodeError::TooShort {
            expected: MIN_PACKET_SIZE,
            actual: len,
        });
    }

    // 2. Start marker
    if data[..2] != START_MARKER {
        return DecodedPacket::failed(DecodeError::BadMagic(data[0], data[1]));
    }

    // 3. Protocol type
    if data[2] != PROTOCOL_TYPE {
        return DecodedPacket::failed(DecodeError::BadProtocolType(data[2]));
    }

    let mut offset = 3;

    // 4. Device id
    let id_len = data[offset] as usize;
    offset += 1;
    if offset + id_len > len {
        return DecodedPacket::failed(DecodeError::TruncatedDeviceId {
            offset,
            needed: id_len,
            len,
        });
    }
    let device_id = data[offset..offset + id_len].to_vec();
    offset += id_len;

    // 5. Password
    if offset >= len {
        return DecodedPacket::failed(DecodeError::TruncatedPassword {
            offset,
            needed: 1,
            len,
        });
    }
    let pw_len = data[offset] as usize;
    offset += 1;
    if offset + pw_len > len {
        return DecodedPacket::failed(DecodeError::TruncatedPassword {
            offset,
            needed: pw_len,
            len,
        });
    }
    let password = data[offset..offset + pw_len].to_vec();
    offset += pw_len;

    // 6-7. Function byte, which must sit before the checksum trailer
    let region_end = len - CHECKSUM_SIZE;
    if offset >= region_end {
        return DecodedPacket::failed(DecodeError::ChecksumRegionMismatch {
            header_end: offset + 1,
            region_end,
        });
    }
    let function = Function::from(data[offset]);
    offset += 1;

    // 8. Checksum
    if let Err(error) = verify_checksum(data) {
        return DecodedPacket::failed(error);
    }

    let header = PacketHeader {
        device_id,
        password,
        function,
    };

    // 9. Parameter region
    let (entries, error) = walk_parameters(&data[offset..region_end]);
    debug!("decoded {} {} entries", entries.len(), function);

    DecodedPacket {
        header: Some(header),
        entries,
        error,
    }
}

/// Walk the parameter region left to right.
fn walk_parameters(region: &[u8]) -> (Vec<ParameterEntry>, Option<DecodeError>) {
    let mut entries = Vec::new();
    let mut i = 0;

    while i < region.len() {
        let byte = region[i];
        let next = region.get(i + 1).copied();

        match byte {
            MARKER_SIZE => {
                // FE size id data[size]
                if i + 2 >= region.len() {
                    let error = DecodeError::TruncatedParameterBlock {
                        offset: i,
                        needed: 3,
                        available: region.len() - i,
                    };
                    warn!("{}", error);
                    return (entries, Some(error));
                }
                let size = region[i + 1] as usize;
                let id = region[i + 2];
                let end = i + 3 + size;
                if end > region.len() {
                    let error = DecodeError::TruncatedParameterBlock {
                        offset: i,
                        needed: 3 + size,
                        available: region.len() - i,
                    };
                    warn!("{}", error);
                    return (entries, Some(error));
                }
                entries.push(ParameterEntry::Block {
                    id,
                    data: region[i + 3..end].to_vec(),
                });
                i = end;
            }
            MARKER_PAGE => {
                debug!("page marker: {:02x?}", next);
                entries.push(ParameterEntry::Page(next));
                i += 2;
            }
            MARKER_FUNC => {
                debug!("function marker: {:02x?}", next);
                entries.push(ParameterEntry::Function(next));
                i += 2;
            }
            MARKER_NOT_SUPPORTED => {
                debug!("not supported marker: {:02x?}", next);
                entries.push(ParameterEntry::NotSupported(next));
                i += 2;
            }
            id => {
                match next {
                    Some(value) => entries.push(ParameterEntry::Value { id, value }),
                    None => debug!("dropping parameter 0x{:02X} without a value byte", id),
                }
                i += 2;
            }
        }
    }

    (entries, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a reply around a raw parameter region, with a valid checksum.
    fn reply(device_id: &[u8], password: &[u8], region: &[u8]) -> Vec<u8> {
        let mut buf = vec![0xFD, 0xFD, 0x02, device_id.len() as u8];
        buf.extend_from_slice(device_id);
        buf.push(password.len() as u8);
        buf.extend_from_slice(password);
        buf.push(FUNC_RESPONSE);
        buf.extend_from_slice(region);
        let checksum = compute_checksum(&buf[2..]);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }

    #[test]
    fn test_encode_write_on() {
        let params = ParameterList::new().with(0x01u8, 1u8);
        let packet = encode_packet(FUNC_WRITE, &params, b"ABC", b"pw").unwrap();

        let checksum = compute_checksum(&packet[2..packet.len() - 2]);
        let mut expected = vec![
            0xFD, 0xFD, 0x02, 0x03, 0x41, 0x42, 0x43, 0x02, 0x70, 0x77, 0x03, 0x01, 0x01,
        ];
        expected.push((checksum & 0xFF) as u8);
        expected.push((checksum >> 8) as u8);

        assert_eq!(packet, expected);
        assert_eq!(&packet[packet.len() - 2..], &[0xB9, 0x01]);
    }

    #[test]
    fn test_encode_empty_credentials_and_params() {
        let packet = encode_packet(FUNC_READ, &ParameterList::new(), b"", b"").unwrap();
        assert_eq!(packet, vec![0xFD, 0xFD, 0x02, 0x00, 0x00, 0x01, 0x03, 0x00]);
    }

    #[test]
    fn test_encode_rejects_long_credentials() {
        let long = vec![b'x'; 256];
        let err = encode_packet(FUNC_READ, &ParameterList::new(), &long, b"pw").unwrap_err();
        assert!(matches!(
            err,
            EncodingError::CredentialTooLong {
                field: CredentialField::DeviceId,
                actual: 256,
                ..
            }
        ));

        let err = encode_packet(FUNC_READ, &ParameterList::new(), b"id", &long).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::CredentialTooLong {
                field: CredentialField::Password,
                ..
            }
        ));
    }

    #[test]
    fn test_roundtrip_plain_pairs() {
        let params = ParameterList::new()
            .with(0x01u8, 1u8)
            .with(0x02u8, 3u8)
            .with(0xB7u8, 2u8)
            .with(0x44u8, 0x99u8);
        let packet = encode_packet(FUNC_WRITE, &params, b"003A0038", b"1111").unwrap();

        let decoded = decode_packet(&packet);
        assert!(decoded.is_complete());

        let header = decoded.header.as_ref().unwrap();
        assert_eq!(header.device_id, b"003A0038");
        assert_eq!(header.password, b"1111");
        assert_eq!(header.function, Function::Write);

        let pairs: Vec<_> = decoded.values().collect();
        assert_eq!(pairs, params.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_decode_too_short() {
        let decoded = decode_packet(&[0xFD, 0xFD, 0x02]);
        assert_eq!(
            decoded.error,
            Some(DecodeError::TooShort {
                expected: 8,
                actual: 3
            })
        );
        assert!(decoded.entries.is_empty());
        assert!(decoded.header.is_none());
    }

    #[test]
    fn test_decode_bad_magic() {
        let mut packet = reply(b"id", b"pw", &[0x01, 0x01]);
        packet[1] = 0xFE;
        assert_eq!(decode_packet(&packet).error, Some(DecodeError::BadMagic(0xFD, 0xFE)));
    }

    #[test]
    fn test_decode_bad_protocol_type() {
        let mut packet = reply(b"id", b"pw", &[0x01, 0x01]);
        packet[2] = 0x03;
        assert_eq!(
            decode_packet(&packet).error,
            Some(DecodeError::BadProtocolType(0x03))
        );
    }

    #[test]
    fn test_decode_truncated_device_id() {
        // Claims a 200-byte id in a 10-byte packet
        let packet = [0xFD, 0xFD, 0x02, 200, 0x41, 0x42, 0x00, 0x06, 0x00, 0x00];
        assert!(matches!(
            decode_packet(&packet).error,
            Some(DecodeError::TruncatedDeviceId { needed: 200, .. })
        ));
    }

    #[test]
    fn test_decode_truncated_password() {
        let packet = [0xFD, 0xFD, 0x02, 0x01, 0x41, 50, 0x70, 0x06, 0x00, 0x00];
        assert!(matches!(
            decode_packet(&packet).error,
            Some(DecodeError::TruncatedPassword { needed: 50, .. })
        ));
    }

    #[test]
    fn test_decode_header_overlapping_checksum() {
        // Id and password fit in the packet but leave no room for the function byte
        let packet = [0xFD, 0xFD, 0x02, 0x02, 0x41, 0x42, 0x00, 0x06, 0x00];
        assert!(matches!(
            decode_packet(&packet).error,
            Some(DecodeError::ChecksumRegionMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_checksum_invalid_skips_parameters() {
        let mut packet = reply(b"id", b"pw", &[0x01, 0x01, 0x02, 0x02]);
        let last = packet.len() - 1;
        packet[last] ^= 0x80;

        let decoded = decode_packet(&packet);
        assert!(matches!(decoded.error, Some(DecodeError::ChecksumInvalid { .. })));
        assert_eq!(decoded.error.map(Err), Some(verify_checksum(&packet)));
        assert!(decoded.entries.is_empty());
    }

    #[test]
    fn test_decode_markers() {
        let region = [
            0xFF, 0x00, // page 0
            0x01, 0x01, // on
            0xFC, 0x06, // function marker
            0xFD, 0x44, // 0x44 not supported
            0xFE, 0x02, 0x7C, 0xAA, 0xBB, // 2-byte block for 0x7C
            0x02, 0x02, // speed 2
        ];
        let decoded = decode_packet(&reply(b"id", b"pw", &region));

        assert!(decoded.is_complete());
        assert_eq!(
            decoded.entries,
            vec![
                ParameterEntry::Page(Some(0x00)),
                ParameterEntry::Value { id: 0x01, value: 0x01 },
                ParameterEntry::Function(Some(0x06)),
                ParameterEntry::NotSupported(Some(0x44)),
                ParameterEntry::Block {
                    id: 0x7C,
                    data: vec![0xAA, 0xBB]
                },
                ParameterEntry::Value { id: 0x02, value: 0x02 },
            ]
        );
    }

    #[test]
    fn test_decode_truncated_size_block_keeps_partial() {
        // Block claims 5 data bytes but only 1 remains
        let region = [0x01, 0x01, 0xFE, 0x05, 0x7C, 0xAA];
        let decoded = decode_packet(&reply(b"id", b"pw", &region));

        assert_eq!(
            decoded.error,
            Some(DecodeError::TruncatedParameterBlock {
                offset: 2,
                needed: 8,
                available: 4
            })
        );
        assert_eq!(
            decoded.entries,
            vec![ParameterEntry::Value { id: 0x01, value: 0x01 }]
        );
        assert!(decoded.header.is_some());
    }

    #[test]
    fn test_decode_size_marker_at_region_end() {
        let region = [0x02, 0x03, 0xFE, 0x01];
        let decoded = decode_packet(&reply(b"id", b"pw", &region));

        assert!(matches!(
            decoded.error,
            Some(DecodeError::TruncatedParameterBlock { needed: 3, .. })
        ));
        assert_eq!(decoded.values().collect::<Vec<_>>(), vec![(0x02, 0x03)]);
    }

    #[test]
    fn test_decode_dangling_marker_and_id() {
        let decoded = decode_packet(&reply(b"id", b"pw", &[0x01, 0x00, 0xFF]));
        assert!(decoded.is_complete());
        assert_eq!(decoded.entries.last(), Some(&ParameterEntry::Page(None)));

        let decoded = decode_packet(&reply(b"id", b"pw", &[0x01, 0x00, 0x02]));
        assert!(decoded.is_complete());
        assert_eq!(decoded.values().collect::<Vec<_>>(), vec![(0x01, 0x00)]);
    }
}
