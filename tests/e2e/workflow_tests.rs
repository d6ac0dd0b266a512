//! Complete workflow E2E tests: open -> send -> receive -> close
//!
//! These tests verify full end-to-end workflows including:
//! - The modem handshake against a mock device
//! - Repeated open/close cycles without leaking the handle
//! - Terminal signals on the read channels

use crate::common::{let_loop_run, mock_port, next_event, wait_until};
use pretty_assertions::assert_eq;
use ttylink::{LineSettings, Parity, PortState, Received, StopBits};

#[tokio::test]
async fn test_full_workflow_open_send_receive_close() {
    let fixture = mock_port();
    let port = &fixture.port;
    let device = &fixture.device;

    let mut states = port.subscribe_state();
    let mut data = port.subscribe_data();
    let mut text = port.subscribe_text();

    // Open at 9600 8N1
    port.open().unwrap();
    assert_eq!(next_event(&mut states).await, PortState::Open);
    assert_eq!(
        device.current_settings(),
        Some(LineSettings {
            baud_rate: 9600,
            parity: Parity::None,
            stop_bits: StopBits::One,
        })
    );

    // Send the command
    assert_eq!(port.send("AT\r\n").unwrap(), 4);
    assert_eq!(device.written(), vec![b"AT\r\n".to_vec()]);

    // Device answers
    device.inject(b"OK\r\n");
    assert_eq!(next_event(&mut data).await, Received::Payload(b"OK\r\n".to_vec()));
    assert_eq!(next_event(&mut text).await, Received::Payload("OK\r\n".to_string()));

    // Close
    port.close().unwrap();
    assert_eq!(next_event(&mut states).await, PortState::Closed);
    assert!(!device.is_open());
    assert!(!port.has_handle());
    assert_eq!(device.drain_calls(), 1);
    assert_eq!(device.restore_calls(), 1);

    // Exactly one payload per channel, then the end-of-session marker
    assert_eq!(next_event(&mut data).await, Received::Ended(PortState::Closed));
    assert_eq!(next_event(&mut text).await, Received::Ended(PortState::Closed));
    assert!(data.drain().is_empty());

    let stats = port.stats();
    assert_eq!(stats.bytes_written, 4);
    assert_eq!(stats.bytes_read, 4);
    assert_eq!(stats.data_ticks, 1);
}

#[tokio::test]
async fn test_repeated_open_close_cycles_release_handle() {
    let fixture = mock_port();
    let mut states = fixture.port.subscribe_state();

    for cycle in 1..=5 {
        fixture.port.open().unwrap();
        assert!(fixture.device.is_open());
        assert_eq!(next_event(&mut states).await, PortState::Open);

        fixture.port.close().unwrap();
        assert_eq!(fixture.port.state(), PortState::Closed);
        assert!(!fixture.device.is_open());
        assert_eq!(next_event(&mut states).await, PortState::Closed);
        assert_eq!(fixture.device.open_count(), cycle);
    }
}

#[tokio::test]
async fn test_idle_ticks_publish_nothing() {
    let fixture = mock_port();
    let mut states = fixture.port.subscribe_state();
    fixture.port.open().unwrap();
    assert_eq!(next_event(&mut states).await, PortState::Open);

    let mut data = fixture.port.subscribe_data();
    let mut text = fixture.port.subscribe_text();

    let device = fixture.device.clone();
    wait_until(|| device.read_calls() >= 3).await;

    assert!(data.drain().is_empty());
    assert!(text.drain().is_empty());
    assert!(states.drain().is_empty());
}

#[tokio::test]
async fn test_undecodable_bytes_produce_data_and_decode_error() {
    let fixture = mock_port();
    fixture.port.open().unwrap();
    let mut data = fixture.port.subscribe_data();
    let mut text = fixture.port.subscribe_text();

    fixture.device.inject(&[b'O', b'K', 0xc3, 0xa9]);

    assert_eq!(
        next_event(&mut data).await,
        Received::Payload(vec![b'O', b'K', 0xc3, 0xa9])
    );
    let event = next_event(&mut text).await;
    assert!(event.payload().is_none());
    assert!(matches!(event.error(), Some(ttylink::PortError::DecodeFailed(_))));

    let_loop_run(3).await;
    assert!(data.drain().is_empty());
    assert!(text.drain().is_empty());
}

#[tokio::test]
async fn test_bursts_arrive_in_order() {
    let fixture = mock_port();
    fixture.port.open().unwrap();
    let mut text = fixture.port.subscribe_text();

    let mut received = String::new();
    for line in ["+CSQ: 21,0\r\n", "OK\r\n", "RING\r\n"] {
        fixture.device.inject(line.as_bytes());
        while !received.ends_with(line) {
            match next_event(&mut text).await {
                Received::Payload(chunk) => received.push_str(&chunk),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    assert_eq!(received, "+CSQ: 21,0\r\nOK\r\nRING\r\n");
}
