//! Termios-backed port tests over a pseudo-terminal.
//!
//! A pty slave accepts the same attribute calls as a real UART, so these
//! exercise the full open, configure, read, write and close path without
//! hardware.

use super::utils::Pty;
use crate::common::next_event;
use pretty_assertions::assert_eq;
use std::time::Duration;
use ttylink::{Parity, Port, PortError, PortState, Received};

#[tokio::test]
async fn test_pty_round_trip() {
    // Arrange
    let pty = Pty::open().expect("Failed to allocate pty");
    let port = Port::new(pty.slave_path.clone());
    let mut states = port.subscribe_state();
    let mut text = port.subscribe_text();

    // Act: open and send
    port.open().expect("Failed to open pty slave");
    assert_eq!(next_event(&mut states).await, PortState::Open);
    assert_eq!(port.send("AT\r\n").unwrap(), 4);

    // Assert: the bytes reach the other end untranslated
    assert_eq!(
        pty.read_exact_within(4, Duration::from_secs(2)),
        b"AT\r\n".to_vec()
    );

    // Act: the other end answers
    pty.write(b"OK\r\n").unwrap();

    // Assert
    let mut answer = String::new();
    while answer.len() < 4 {
        match next_event(&mut text).await {
            Received::Payload(chunk) => answer.push_str(&chunk),
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(answer, "OK\r\n");

    port.close().unwrap();
    assert_eq!(next_event(&mut states).await, PortState::Closed);
}

#[tokio::test]
async fn test_pty_settings_change_while_open() {
    let pty = Pty::open().unwrap();
    let port = Port::new(pty.slave_path.clone());
    port.open().unwrap();

    port.set_baud_rate(115200).unwrap();
    port.set_parity(Parity::Even).unwrap();

    assert_eq!(port.baud_rate(), 115200);
    assert_eq!(port.parity(), Parity::Even);
    port.close().unwrap();
}

#[tokio::test]
async fn test_pty_unsupported_baud_rolls_back() {
    let pty = Pty::open().unwrap();
    let port = Port::new(pty.slave_path.clone());
    port.open().unwrap();

    let result = port.set_baud_rate(12345);

    assert_eq!(result, Err(PortError::options_apply_failed(pty.slave_path.clone())));
    assert_eq!(port.baud_rate(), 9600);
    port.close().unwrap();
}

#[tokio::test]
async fn test_pty_reopen_after_close() {
    let pty = Pty::open().unwrap();
    let port = Port::new(pty.slave_path.clone());

    for _ in 0..3 {
        port.open().unwrap();
        assert!(port.has_handle());
        port.close().unwrap();
        assert!(!port.has_handle());
    }
}

#[tokio::test]
async fn test_missing_device_fails_to_open() {
    let port = Port::new("/dev/ttylink-does-not-exist");

    assert_eq!(
        port.open(),
        Err(PortError::open_failed("/dev/ttylink-does-not-exist"))
    );
    assert_eq!(port.state(), PortState::Closed);
}
