//! Shared test utilities for ttylink tests.
//!
//! This module provides common test infrastructure including:
//! - Mock-backed port construction
//! - Helpers that wait for events with a deadline
//! - Helpers that let the read loop run for a few ticks

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use ttylink::{MockConnector, MockDevice, Port, PortOptions, Subscription};

/// Path every mock-backed test port uses.
pub const MOCK_PATH: &str = "/dev/ttyMOCK0";

/// How long to wait for an expected event before failing.
pub const EVENT_DEADLINE: Duration = Duration::from_secs(2);

/// A port wired to a mock device, plus the handles tests inspect.
pub struct MockFixture {
    pub port: Port,
    pub device: MockDevice,
    pub connector: MockConnector,
}

/// Create a closed port backed by a fresh mock device.
pub fn mock_port() -> MockFixture {
    mock_port_with(PortOptions::default())
}

/// Create a closed port backed by a fresh mock device with custom options.
pub fn mock_port_with(options: PortOptions) -> MockFixture {
    let connector = MockConnector::new();
    let device = connector.add_device(MOCK_PATH);
    let port = Port::with_connector(MOCK_PATH, Arc::new(connector.clone()), options);
    MockFixture {
        port,
        device,
        connector,
    }
}

/// Wait for the next event on `subscription`, failing the test on timeout.
pub async fn next_event<T: Clone>(subscription: &mut Subscription<T>) -> T {
    tokio::time::timeout(EVENT_DEADLINE, subscription.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Let the read loop run for roughly `ticks` periods of the default interval.
pub async fn let_loop_run(ticks: u32) {
    tokio::time::sleep(ttylink::link::DEFAULT_POLL_INTERVAL * ticks).await;
}

/// Wait until `condition` holds, failing the test on timeout.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(EVENT_DEADLINE, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
