//! Protocol error types.

use thiserror::Error;

/// Which credential field a length error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    /// The device identifier.
    DeviceId,
    /// The device password.
    Password,
}

impl std::fmt::Display for CredentialField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialField::DeviceId => write!(f, "device id"),
            CredentialField::Password => write!(f, "password"),
        }
    }
}

/// Errors that prevent a command packet from being built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// A credential does not fit its one-byte length prefix.
    #[error("{field} too long: maximum {max} bytes, got {actual}")]
    CredentialTooLong {
        /// The offending field.
        field: CredentialField,
        /// Maximum allowed length.
        max: usize,
        /// Actual length supplied.
        actual: usize,
    },
}

/// Diagnostics reported while decoding a device reply.
///
/// None of these abort decoding: the decoder always hands back whatever
/// parameter entries it collected before the problem, paired with the
/// diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Packet is shorter than the minimum header plus checksum.
    #[error("packet too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Packet does not start with `FD FD`.
    #[error("bad start marker: {0:02X} {1:02X}")]
    BadMagic(u8, u8),

    /// Protocol type byte is not `0x02`.
    #[error("bad protocol type: 0x{0:02X}")]
    BadProtocolType(u8),

    /// Device id length runs past the end of the packet.
    #[error("device id truncated: need {needed} bytes at offset {offset}, packet is {len} bytes")]
    TruncatedDeviceId {
        /// Offset of the first id byte.
        offset: usize,
        /// Declared id length.
        needed: usize,
        /// Packet length.
        len: usize,
    },

    /// Password length runs past the end of the packet.
    #[error("password truncated: need {needed} bytes at offset {offset}, packet is {len} bytes")]
    TruncatedPassword {
        /// Offset of the first password byte.
        offset: usize,
        /// Declared password length.
        needed: usize,
        /// Packet length.
        len: usize,
    },

    /// Header runs into the checksum trailer.
    #[error("checksum region mismatch: header ends at {header_end}, checksum starts at {region_end}")]
    ChecksumRegionMismatch {
        /// Offset just past the function byte.
        header_end: usize,
        /// Offset of the checksum trailer.
        region_end: usize,
    },

    /// Trailing checksum does not match the packet contents.
    #[error("checksum mismatch: expected 0x{expected:04X}, got 0x{actual:04X}")]
    ChecksumInvalid {
        /// Checksum computed over the packet.
        expected: u16,
        /// Checksum carried in the trailer.
        actual: u16,
    },

    /// A SIZE block declares more data than the parameter region holds.
    #[error("parameter block truncated at region offset {offset}: need {needed} bytes, {available} left")]
    TruncatedParameterBlock {
        /// Offset of the SIZE marker within the parameter region.
        offset: usize,
        /// Bytes the block needs, marker included.
        needed: usize,
        /// Bytes left in the region from the marker on.
        available: usize,
    },
}

impl DecodeError {
    /// Returns true if the packet structure was rejected before any
    /// parameter could be read.
    pub fn is_structural(&self) -> bool {
        !matches!(self, DecodeError::TruncatedParameterBlock { .. })
    }
}
