//! Vento UDP Protocol
//!
//! This crate provides types and utilities for talking to Blauberg Vento
//! ventilation units over their UDP control protocol. It is pure: it builds
//! command packets and decodes replies, and leaves sockets to the caller.
//!
//! # Protocol Overview
//!
//! Every packet starts with `FD FD 02`, carries the device id and password
//! with one-byte length prefixes, a function code, a parameter region and a
//! 16-bit additive checksum:
//!
//! - **Commands** (host → unit): function `READ` (0x01) or `WRITE` (0x03)
//!   followed by plain `id value` pairs
//! - **Replies** (unit → host): function `RESPONSE` (0x06); the parameter
//!   region may interleave PAGE, FUNC, SIZE and NOT_SUPPORTED markers
//!
//! Decoding never fails outright. A malformed reply yields whatever
//! parameters were read before the problem plus a [`DecodeError`]
//! describing it.
//!
//! # Example
//!
//! ```rust
//! use vento_protocol::{decode_packet, Credentials, FanCommand};
//!
//! let credentials = Credentials::new("003A0038", "1111")?;
//! let packet = FanCommand::TurnOn.to_request().encode(&credentials);
//!
//! // A unit echoes the header back; decoding our own packet shows the layout.
//! let decoded = decode_packet(&packet);
//! assert_eq!(decoded.parameters().unit_on(), Some(true));
//! # Ok::<(), vento_protocol::EncodingError>(())
//! ```

mod checksum;
mod commands;
mod constants;
mod error;
mod packet;
mod params;
mod types;

pub use checksum::*;
pub use commands::*;
pub use constants::*;
pub use error::*;
pub use packet::*;
pub use params::*;
pub use types::*;

/// Result type for encoding operations.
pub type Result<T> = std::result::Result<T, EncodingError>;
