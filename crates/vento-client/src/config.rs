//! Device configuration loaded from YAML.
//!
//! ```yaml
//! name: Bedroom
//! ip: 192.168.1.40
//! port: 4000
//! device_id: "003A0038"
//! password: "1111"
//! timeout_ms: 3000
//! ```

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use vento_protocol::{
    Credentials, DEFAULT_PORT, DEFAULT_RESPONSE_BUFFER, DEFAULT_TIMEOUT_MS, MIN_PACKET_SIZE,
};

use crate::error::ConfigError;
use crate::transport::{DeviceAddress, TransportOptions};

/// Connection settings for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Display name used in status output.
    pub name: String,
    pub ip: Option<String>,
    pub port: u16,
    #[serde(alias = "deviceId")]
    pub device_id: String,
    pub password: String,
    pub timeout_ms: u64,
    /// Reply buffer size in bytes.
    pub response_buffer: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "Vento".to_string(),
            ip: None,
            port: DEFAULT_PORT,
            device_id: String::new(),
            password: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            response_buffer: DEFAULT_RESPONSE_BUFFER,
        }
    }
}

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub device_id: Option<String>,
    pub password: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl DeviceConfig {
    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Replace any field set in `overrides`.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(ip) = overrides.ip {
            self.ip = Some(ip);
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(device_id) = overrides.device_id {
            self.device_id = device_id;
        }
        if let Some(password) = overrides.password {
            self.password = password;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
    }

    /// Check every field without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.address()?;
        self.credentials()?;
        self.transport_options()?;
        Ok(())
    }

    pub fn address(&self) -> Result<DeviceAddress, ConfigError> {
        let ip = self
            .ip
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .ok_or(ConfigError::MissingField("ip"))?;
        let ip: IpAddr = ip
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(ip.to_string()))?;
        Ok(DeviceAddress::new(ip).with_port(self.port))
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        Ok(Credentials::new(
            self.device_id.as_bytes(),
            self.password.as_bytes(),
        )?)
    }

    pub fn transport_options(&self) -> Result<TransportOptions, ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.response_buffer < MIN_PACKET_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "response_buffer",
                message: format!(
                    "must hold at least {} bytes, got {}",
                    MIN_PACKET_SIZE, self.response_buffer
                ),
            });
        }
        Ok(TransportOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            response_buffer: self.response_buffer,
        })
    }
}
