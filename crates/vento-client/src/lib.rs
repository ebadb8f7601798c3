//! Vento Client
//!
//! Talks to Blauberg Vento ventilation units over UDP using the packet
//! codec from [`vento_protocol`].
//!
//! - [`transport`]: one-shot datagram round trips with a receive timeout
//! - [`VentoClient`]: typed commands (power, speed, mode) and status reads
//! - [`DeviceConfig`]: YAML connection settings with command-line overrides
//!
//! # Example
//!
//! ```no_run
//! use vento_client::{DeviceAddress, VentoClient};
//! use vento_protocol::Credentials;
//!
//! # async fn example() -> Result<(), vento_client::ClientError> {
//! let address = DeviceAddress::new("192.168.1.40".parse().unwrap());
//! let client = VentoClient::new(address, Credentials::new("003A0038", "1111")?);
//!
//! client.turn_on().await?;
//! let status = client.status().await?;
//! println!("{}", status.summary());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod transport;

pub use client::{Exchange, VentoClient};
pub use config::{ConfigOverrides, DeviceConfig};
pub use error::{ClientError, ConfigError, TransportError};
pub use transport::{send_and_receive, DeviceAddress, TransportOptions};
