//! Tests against a real serial device.
//!
//! Ignored by default. Set `TEST_PORT` (and optionally `TEST_BAUD`) and run
//! with `--ignored`. Loopback tests also need `TEST_LOOPBACK=1` and a jumper
//! between TX and RX.

use super::utils::TestPortConfig;
use crate::common::next_event;
use std::time::Duration;
use ttylink::{Port, PortState, Received};

#[tokio::test]
#[ignore]
async fn test_real_port_open_close() {
    let Some(config) = TestPortConfig::from_env() else {
        eprintln!("TEST_PORT not set, skipping");
        return;
    };

    let port = Port::new(config.port_name.clone());
    port.set_baud_rate(config.baud_rate).unwrap();
    port.open().expect("Failed to open port");
    assert_eq!(port.state(), PortState::Open);

    port.close().expect("Failed to close port");
    assert_eq!(port.state(), PortState::Closed);
}

#[tokio::test]
#[ignore]
async fn test_real_port_loopback() {
    let Some(config) = TestPortConfig::from_env().filter(|c| c.loopback_enabled) else {
        eprintln!("TEST_PORT/TEST_LOOPBACK not set, skipping");
        return;
    };

    let port = Port::new(config.port_name.clone());
    port.set_baud_rate(config.baud_rate).unwrap();
    let mut data = port.subscribe_data();
    port.open().unwrap();

    let payload = b"ttylink loopback\r\n";
    assert_eq!(port.send_data(payload).unwrap(), payload.len());

    let mut echoed = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while echoed.len() < payload.len() && tokio::time::Instant::now() < deadline {
        if let Received::Payload(chunk) = next_event(&mut data).await {
            echoed.extend_from_slice(&chunk);
        }
    }
    assert_eq!(echoed, payload.to_vec());

    port.close().unwrap();
}
