//! Protocol constants
//!
//! Framing bytes, function codes, in-band markers and parameter ids used by
//! the Vento UDP protocol.

// ============================================================================
// Framing
// ============================================================================

/// Start marker that opens every packet.
pub const START_MARKER: [u8; 2] = [0xFD, 0xFD];
/// Protocol type tag following the start marker.
pub const PROTOCOL_TYPE: u8 = 0x02;
/// Offset of the protocol type tag. The checksum region starts here.
pub const CHECKSUM_REGION_START: usize = 2;
/// Size of the trailing checksum in bytes.
pub const CHECKSUM_SIZE: usize = 2;
/// Smallest packet the decoder will look at.
pub const MIN_PACKET_SIZE: usize = 8;
/// Longest device id or password that fits the one-byte length prefix.
pub const MAX_CREDENTIAL_LEN: usize = 255;

// ============================================================================
// Function Codes
// ============================================================================

/// Read the listed parameters.
pub const FUNC_READ: u8 = 0x01;
/// Write the listed parameters.
pub const FUNC_WRITE: u8 = 0x03;
/// Device reply to a read or write.
pub const FUNC_RESPONSE: u8 = 0x06;

// ============================================================================
// In-band Markers (parameter region of device replies)
// ============================================================================

/// Switches the parameter page for the ids that follow.
pub const MARKER_PAGE: u8 = 0xFF;
/// Switches the function for the ids that follow.
pub const MARKER_FUNC: u8 = 0xFC;
/// Variable-size value: size, id, then `size` data bytes.
pub const MARKER_SIZE: u8 = 0xFE;
/// The following parameter id is not supported by the unit.
pub const MARKER_NOT_SUPPORTED: u8 = 0xFD;

/// Returns true if `byte` opens a marker entry rather than a plain pair.
pub fn is_marker(byte: u8) -> bool {
    matches!(
        byte,
        MARKER_PAGE | MARKER_FUNC | MARKER_SIZE | MARKER_NOT_SUPPORTED
    )
}

// ============================================================================
// Parameter Ids
// ============================================================================

/// Unit on/off (0 = off, 1 = on).
pub const PARAM_UNIT_ON_OFF: u8 = 0x01;
/// Speed number (1..=3).
pub const PARAM_SPEED_NUMBER: u8 = 0x02;
/// Ventilation mode (0 = ventilation, 1 = heat recovery, 2 = supply).
pub const PARAM_VENTILATION_MODE: u8 = 0xB7;

// ============================================================================
// Speed
// ============================================================================

/// Percentage step per speed level.
pub const PERCENT_PER_LEVEL: u16 = 33;
/// Lowest speed level.
pub const MIN_SPEED_LEVEL: u8 = 1;
/// Highest speed level.
pub const MAX_SPEED_LEVEL: u8 = 3;

// ============================================================================
// Transport Defaults
// ============================================================================

/// Default UDP port of the unit.
pub const DEFAULT_PORT: u16 = 4000;
/// Default receive timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
/// Default reply buffer size.
pub const DEFAULT_RESPONSE_BUFFER: usize = 256;
