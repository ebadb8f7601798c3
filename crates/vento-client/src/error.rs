//! Error types for the Vento client.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use vento_protocol::{DecodeError, EncodingError};

/// Errors from a single UDP round trip.
///
/// Both variants are retryable; the client never retries on its own.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No reply arrived within the receive timeout.
    #[error("no reply from {addr} within {}ms", timeout.as_millis())]
    Timeout {
        /// Unit the request was sent to.
        addr: SocketAddr,
        /// Receive timeout that elapsed.
        timeout: Duration,
    },

    /// Binding, sending or receiving failed.
    #[error("socket error talking to {addr}: {source}")]
    Socket {
        /// Unit the request was sent to.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Returns true if the same request may simply be sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout { .. } => true,
            TransportError::Socket { source, .. } => !matches!(
                source.kind(),
                std::io::ErrorKind::AddrNotAvailable | std::io::ErrorKind::PermissionDenied
            ),
        }
    }
}

/// Errors loading or validating a device configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid ip address {0:?}")]
    InvalidAddress(String),

    #[error("invalid {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Credentials(#[from] EncodingError),
}

/// Errors surfaced by [`VentoClient`](crate::VentoClient).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Returns true if the same request may simply be sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(e) => e.is_retryable(),
            // A corrupted datagram says nothing about the next one.
            ClientError::Decode(_) => true,
            ClientError::Encoding(_) | ClientError::Config(_) => false,
        }
    }
}
