//! Round trips against a fake unit listening on loopback.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use vento_client::{ClientError, DeviceAddress, TransportError, TransportOptions, VentoClient};
use vento_protocol::{
    compute_checksum, decode_packet, Credentials, DecodeError, FanCommand, Function,
    VentilationMode, FUNC_RESPONSE, MARKER_NOT_SUPPORTED, MARKER_PAGE, PARAM_SPEED_NUMBER,
    PARAM_UNIT_ON_OFF, PARAM_VENTILATION_MODE,
};

const DEVICE_ID: &str = "003A0038";
const PASSWORD: &str = "1111";

/// Wrap a parameter region in a reply header with a valid checksum.
fn reply_packet(device_id: &[u8], password: &[u8], region: &[u8]) -> Vec<u8> {
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

/// Parameter state of the fake unit.
#[derive(Debug, Clone, Copy)]
struct UnitState {
    on: u8,
    speed: u8,
    mode: u8,
}

impl UnitState {
    fn get(&self, id: u8) -> Option<u8> {
        match id {
            PARAM_UNIT_ON_OFF => Some(self.on),
            PARAM_SPEED_NUMBER => Some(self.speed),
            PARAM_VENTILATION_MODE => Some(self.mode),
            _ => None,
        }
    }

    fn set(&mut self, id: u8, value: u8) {
        match id {
            PARAM_UNIT_ON_OFF => self.on = value,
            PARAM_SPEED_NUMBER => self.speed = value,
            PARAM_VENTILATION_MODE => self.mode = value,
            _ => {}
        }
    }
}

/// Start a fake unit that applies writes and answers reads like the real
/// firmware. Requests with the wrong password are ignored. Every request
/// datagram is forwarded on the returned channel.
async fn spawn_unit(initial: UnitState) -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut state = initial;
        let mut buf = [0u8; 256];
        while let Ok((n, peer)) = socket.recv_from(&mut buf).await {
            let datagram = buf[..n].to_vec();
            let _ = tx.send(datagram.clone());

            let request = decode_packet(&datagram);
            let Some(header) = request.header.as_ref() else {
                continue;
            };
            if header.password != PASSWORD.as_bytes() {
                continue;
            }

            let mut region = vec![MARKER_PAGE, 0x00];
            for (id, value) in request.values() {
                if header.function == Function::Write {
                    state.set(id, value);
                }
                match state.get(id) {
                    Some(current) => region.extend_from_slice(&[id, current]),
                    None => region.extend_from_slice(&[MARKER_NOT_SUPPORTED, id]),
                }
            }

            let reply = reply_packet(&header.device_id, &header.password, &region);
            let _ = socket.send_to(&reply, peer).await;
        }
    });

    (addr, rx)
}

/// Start a unit that answers every request with the same datagram.
async fn spawn_canned_unit(reply: Vec<u8>) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 256];
        while let Ok((_, peer)) = socket.recv_from(&mut buf).await {
            let _ = socket.send_to(&reply, peer).await;
        }
    });

    addr
}

fn client_for(addr: SocketAddr, password: &str) -> VentoClient {
    let options = TransportOptions {
        timeout: Duration::from_millis(500),
        ..Default::default()
    };
    VentoClient::with_options(
        DeviceAddress::from(addr),
        Credentials::new(DEVICE_ID, password).unwrap(),
        options,
    )
}

fn default_state() -> UnitState {
    UnitState {
        on: 0,
        speed: 2,
        mode: 1,
    }
}

#[tokio::test]
async fn test_status_read() {
    let (addr, mut requests) = spawn_unit(default_state()).await;
    let client = client_for(addr, PASSWORD);

    let status = client.status().await.unwrap();
    assert_eq!(status.is_on, Some(false));
    assert_eq!(status.percentage, Some(66));
    assert_eq!(status.speed_level(), Some(2));
    assert_eq!(status.ventilation_mode, Some(VentilationMode::HeatRecovery));
    assert_eq!(
        status.summary(),
        "Unit status [Off], Speed number [2], Ventilation mode [Heat Recovery]"
    );

    // The unit saw exactly the encoded status request
    let credentials = Credentials::new(DEVICE_ID, PASSWORD).unwrap();
    let expected = FanCommand::ReadStatus.to_request().encode(&credentials);
    assert_eq!(requests.recv().await.unwrap(), expected);
}

#[tokio::test]
async fn test_write_commands_change_state() {
    let (addr, _requests) = spawn_unit(default_state()).await;
    let client = client_for(addr, PASSWORD);

    let exchange = client.turn_on().await.unwrap();
    assert!(exchange.error().is_none());
    assert_eq!(exchange.status().is_on, Some(true));

    client.set_percentage(90).await.unwrap();
    client.set_heat_recovery(false).await.unwrap();

    let status = client.status().await.unwrap();
    assert_eq!(status.is_on, Some(true));
    assert_eq!(status.percentage, Some(99));
    assert_eq!(status.heat_recovery(), Some(false));

    client
        .set_ventilation_mode(VentilationMode::Supply)
        .await
        .unwrap();
    let exchange = client.turn_off().await.unwrap();
    assert_eq!(exchange.status().is_on, Some(false));

    let status = client.status().await.unwrap();
    assert_eq!(status.ventilation_mode, Some(VentilationMode::Supply));
}

#[tokio::test]
async fn test_unknown_parameter_reported_not_supported() {
    let (addr, _requests) = spawn_unit(default_state()).await;
    let client = client_for(addr, PASSWORD);

    let request = vento_protocol::CommandRequest::read(&[0x01, 0x44]);
    let exchange = client.send_command(&request).await.unwrap();

    assert!(exchange.error().is_none());
    assert!(exchange
        .decoded
        .entries
        .contains(&vento_protocol::ParameterEntry::NotSupported(Some(0x44))));
    assert_eq!(exchange.parameters().len(), 1);
    assert_eq!(exchange.status().is_on, Some(false));
}

#[tokio::test]
async fn test_wrong_password_times_out() {
    let (addr, _requests) = spawn_unit(default_state()).await;
    let options = TransportOptions {
        timeout: Duration::from_millis(100),
        ..Default::default()
    };
    let client = VentoClient::with_options(
        DeviceAddress::from(addr),
        Credentials::new(DEVICE_ID, "0000").unwrap(),
        options,
    );

    let err = client.status().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Transport(TransportError::Timeout { .. })
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_truncated_block_returns_partial_exchange() {
    // on, heat recovery, then a SIZE block claiming 16 bytes with 2 present
    let reply = reply_packet(
        DEVICE_ID.as_bytes(),
        PASSWORD.as_bytes(),
        &[0x01, 0x01, 0xB7, 0x01, 0xFE, 0x10, 0x7C, 0xAA, 0xBB],
    );
    let addr = spawn_canned_unit(reply.clone()).await;
    let client = client_for(addr, PASSWORD);

    let exchange = client.execute(FanCommand::ReadStatus).await.unwrap();
    assert_eq!(exchange.raw, reply);
    assert!(matches!(
        exchange.error(),
        Some(DecodeError::TruncatedParameterBlock { .. })
    ));
    let status = exchange.status();
    assert_eq!(status.is_on, Some(true));
    assert_eq!(status.heat_recovery(), Some(true));
    assert_eq!(status.percentage, None);

    // The strict status read refuses the partial reply
    let err = client.status().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Decode(DecodeError::TruncatedParameterBlock { .. })
    ));
}

#[tokio::test]
async fn test_corrupted_reply_is_reported() {
    let mut reply = reply_packet(DEVICE_ID.as_bytes(), PASSWORD.as_bytes(), &[0x01, 0x01]);
    let last = reply.len() - 1;
    reply[last] ^= 0xFF;
    let addr = spawn_canned_unit(reply).await;
    let client = client_for(addr, PASSWORD);

    let exchange = client.turn_on().await.unwrap();
    assert!(matches!(
        exchange.error(),
        Some(DecodeError::ChecksumInvalid { .. })
    ));
    assert!(exchange.decoded.entries.is_empty());
    assert!(exchange.status().is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let (addr, _requests) = spawn_unit(default_state()).await;
    let client = client_for(addr, PASSWORD);

    let (a, b) = tokio::join!(client.status(), client.status());
    assert_eq!(a.unwrap(), b.unwrap());
}

#[tokio::test]
async fn test_reply_longer_than_buffer_is_cut_short() {
    // 8-byte header, 15 pairs, 2-byte trailer: 40 bytes
    let mut region = vec![0x01, 0x01, 0x02, 0x02, 0xB7, 0x01, 0x44, 0x10];
    for i in 0..11u8 {
        region.extend_from_slice(&[0x10 + i, i]);
    }
    let reply = reply_packet(b"ID", b"", &region);
    assert_eq!(reply.len(), 40);
    let addr = spawn_canned_unit(reply.clone()).await;

    let small = VentoClient::with_options(
        DeviceAddress::from(addr),
        Credentials::new(DEVICE_ID, PASSWORD).unwrap(),
        TransportOptions {
            timeout: Duration::from_millis(500),
            response_buffer: 16,
        },
    );
    let exchange = small.execute(FanCommand::ReadStatus).await.unwrap();
    assert_eq!(exchange.raw, &reply[..16]);
    assert!(matches!(
        exchange.error(),
        Some(DecodeError::ChecksumInvalid { .. })
    ));
    assert!(exchange.decoded.entries.is_empty());

    // The default buffer holds the whole datagram
    let exchange = client_for(addr, PASSWORD)
        .execute(FanCommand::ReadStatus)
        .await
        .unwrap();
    assert_eq!(exchange.raw, reply);
    assert!(exchange.error().is_none());
    assert_eq!(exchange.parameters().len(), 15);
}
