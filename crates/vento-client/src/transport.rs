//! One-shot UDP round trips to a ventilation unit.
//!
//! Every request opens its own socket, sends one datagram and waits for one
//! reply. The socket is dropped on every exit path, so no state survives
//! between calls.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use vento_protocol::{DEFAULT_PORT, DEFAULT_RESPONSE_BUFFER, DEFAULT_TIMEOUT_MS};

use crate::error::TransportError;

/// Network location of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress {
    /// Unit IP address.
    pub ip: IpAddr,
    /// Control port, 4000 unless changed on the unit.
    pub port: u16,
}

impl DeviceAddress {
    /// Address on the default control port.
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            port: DEFAULT_PORT,
        }
    }

    /// Same address on another port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Address to send datagrams to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl From<SocketAddr> for DeviceAddress {
    fn from(addr: SocketAddr) -> Self {
        Self {
            ip: addr.ip(),
            port: addr.port(),
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// Receive timeout and reply buffer size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// How long to wait for the reply datagram.
    pub timeout: Duration,
    /// Datagrams longer than this are truncated by the socket.
    pub response_buffer: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            response_buffer: DEFAULT_RESPONSE_BUFFER,
        }
    }
}

/// Send `packet` to `addr` and wait for a single reply datagram.
///
/// Returns the raw reply bytes. The first datagram to arrive on the
/// ephemeral socket is taken as the reply.
///
/// # Errors
///
/// Returns [`TransportError::Timeout`] if nothing arrives within
/// `options.timeout`, and [`TransportError::Socket`] if binding, sending or
/// receiving fails.
pub async fn send_and_receive(
    addr: SocketAddr,
    packet: &[u8],
    options: &TransportOptions,
) -> Result<Vec<u8>, TransportError> {
    let socket_error = |source: std::io::Error| TransportError::Socket { addr, source };

    let local: SocketAddr = match addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    let socket = UdpSocket::bind(local).await.map_err(|e| {
        tracing::error!(local = %local, error = %e, "Failed to bind UDP socket");
        socket_error(e)
    })?;

    tracing::debug!(remote = %addr, bytes = packet.len(), "Sending datagram");
    tracing::debug!("Sent: {}", spaced_hex(packet));

    socket.send_to(packet, addr).await.map_err(|e| {
        tracing::error!(remote = %addr, error = %e, "Failed to send datagram");
        socket_error(e)
    })?;

    let mut buf = vec![0u8; options.response_buffer];
    match tokio::time::timeout(options.timeout, socket.recv_from(&mut buf)).await {
        Ok(Ok((n, src))) => {
            if src != addr {
                tracing::debug!(remote = %addr, source = %src, "Reply from unexpected source");
            }
            buf.truncate(n);
            tracing::debug!(remote = %src, bytes = n, "Received datagram");
            tracing::debug!("Received: {}", numbered_hex(&buf));
            Ok(buf)
        }
        Ok(Err(e)) => {
            tracing::error!(remote = %addr, error = %e, "Failed to receive datagram");
            Err(socket_error(e))
        }
        Err(_) => {
            tracing::error!(
                remote = %addr,
                timeout_ms = options.timeout.as_millis() as u64,
                "Timed out waiting for reply"
            );
            Err(TransportError::Timeout {
                addr,
                timeout: options.timeout,
            })
        }
    }
}

/// Bytes as space-separated upper-case hex pairs.
pub fn spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Bytes with their offsets, e.g. `[0]FD [1]FD [2]02`.
pub fn numbered_hex(data: &[u8]) -> String {
    data.iter()
        .enumerate()
        .map(|(i, b)| format!("[{}]{:02X}", i, b))
        .collect::<Vec<_>>()
        .join(" ")
}
