//! Request/reply client for a single unit.

use vento_protocol::{
    decode_packet, CommandRequest, Credentials, DecodeError, DecodedPacket, FanCommand,
    FanStatus, ParsedParameters, VentilationMode,
};

use crate::config::DeviceConfig;
use crate::error::ClientError;
use crate::transport::{send_and_receive, DeviceAddress, TransportOptions};

/// One request and the unit's reply.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Reply datagram as received.
    pub raw: Vec<u8>,
    /// Decode outcome, possibly partial.
    pub decoded: DecodedPacket,
}

impl Exchange {
    pub fn parameters(&self) -> ParsedParameters {
        self.decoded.parameters()
    }

    /// Status from whatever the reply carried, diagnostics ignored.
    pub fn status(&self) -> FanStatus {
        self.parameters().status()
    }

    pub fn error(&self) -> Option<&DecodeError> {
        self.decoded.error.as_ref()
    }

    /// Status, or the decode diagnostic if the reply was not clean.
    pub fn into_status(self) -> Result<FanStatus, DecodeError> {
        match self.decoded.error {
            Some(error) => Err(error),
            None => Ok(self.decoded.parameters().status()),
        }
    }
}

/// Client for one ventilation unit.
///
/// Holds no socket; every call is an independent round trip, so a client can
/// be shared freely across tasks.
#[derive(Debug, Clone)]
pub struct VentoClient {
    address: DeviceAddress,
    credentials: Credentials,
    options: TransportOptions,
}

impl VentoClient {
    pub fn new(address: DeviceAddress, credentials: Credentials) -> Self {
        Self::with_options(address, credentials, TransportOptions::default())
    }

    pub fn with_options(
        address: DeviceAddress,
        credentials: Credentials,
        options: TransportOptions,
    ) -> Self {
        Self {
            address,
            credentials,
            options,
        }
    }

    /// Build a client from a validated configuration.
    pub fn from_config(config: &DeviceConfig) -> Result<Self, ClientError> {
        Ok(Self::with_options(
            config.address()?,
            config.credentials()?,
            config.transport_options()?,
        ))
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Encode `request`, send it and decode the reply.
    ///
    /// A reply that fails to decode is still returned; check
    /// [`Exchange::error`]. Only transport failures are errors here.
    pub async fn send_command(&self, request: &CommandRequest) -> Result<Exchange, ClientError> {
        let packet = request.encode(&self.credentials);

        tracing::debug!(
            device = %self.address,
            function = %request.function,
            params = request.params.len(),
            "Sending command"
        );

        let raw = send_and_receive(self.address.socket_addr(), &packet, &self.options).await?;
        let decoded = decode_packet(&raw);

        match &decoded.error {
            Some(error) => {
                tracing::warn!(device = %self.address, error = %error, "Reply did not decode cleanly")
            }
            None => tracing::debug!(
                device = %self.address,
                "{}",
                decoded.parameters().status().summary()
            ),
        }

        Ok(Exchange { raw, decoded })
    }

    pub async fn execute(&self, command: FanCommand) -> Result<Exchange, ClientError> {
        self.send_command(&command.to_request()).await
    }

    /// Read power, speed and mode.
    ///
    /// Unlike [`execute`](Self::execute), any decode diagnostic is an error.
    pub async fn status(&self) -> Result<FanStatus, ClientError> {
        let exchange = self.execute(FanCommand::ReadStatus).await?;
        Ok(exchange.into_status()?)
    }

    pub async fn turn_on(&self) -> Result<Exchange, ClientError> {
        self.execute(FanCommand::TurnOn).await
    }

    pub async fn turn_off(&self) -> Result<Exchange, ClientError> {
        self.execute(FanCommand::TurnOff).await
    }

    /// Set the speed from a percentage, bucketed: 0-33 is level 1, 34-66 is
    /// level 2 and anything above is level 3.
    pub async fn set_percentage(&self, percentage: u16) -> Result<Exchange, ClientError> {
        self.execute(FanCommand::SetPercentage(percentage)).await
    }

    pub async fn set_ventilation_mode(
        &self,
        mode: VentilationMode,
    ) -> Result<Exchange, ClientError> {
        self.execute(FanCommand::SetVentilationMode(mode)).await
    }

    pub async fn set_heat_recovery(&self, enabled: bool) -> Result<Exchange, ClientError> {
        self.execute(FanCommand::SetHeatRecovery(enabled)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = DeviceConfig::from_yaml("ip: 192.168.1.40\ndevice_id: ID\ntimeout_ms: 100\n")
            .unwrap();
        let client = VentoClient::from_config(&config).unwrap();
        assert_eq!(client.address().to_string(), "192.168.1.40:4000");
        assert_eq!(client.options().timeout.as_millis(), 100);
    }

    #[test]
    fn test_from_config_requires_ip() {
        let result = VentoClient::from_config(&DeviceConfig::default());
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_exchange_status() {
        let reply = FanCommand::TurnOff
            .to_request()
            .encode(&Credentials::new("ID", "").unwrap());
        let exchange = Exchange {
            decoded: decode_packet(&reply),
            raw: reply,
        };
        assert!(exchange.error().is_none());
        assert_eq!(exchange.status().is_on, Some(false));
        assert_eq!(exchange.into_status().unwrap().is_on, Some(false));

        let exchange = Exchange {
            decoded: decode_packet(&[0xFD]),
            raw: vec![0xFD],
        };
        assert!(matches!(
            exchange.into_status(),
            Err(DecodeError::TooShort { .. })
        ));
    }
}
