//! Shared test doubles for dispatch tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tp_common::Recipient;
use tp_dispatch::{DeliveryClient, DeliveryError};

/// One observed delivery attempt
#[derive(Debug, Clone)]
pub struct Call {
    pub recipient: String,
    pub message: String,
    pub at: Instant,
    pub ok: bool,
}

/// Delivery client that records every attempt and fails on configured
/// (recipient, message) pairs.
pub struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    failures: HashSet<(String, String)>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: HashSet::new(),
        }
    }

    pub fn failing_on(pairs: &[(&str, &str)]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: pairs
                .iter()
                .map(|(r, m)| (r.to_string(), m.to_string()))
                .collect(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn sequence(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .iter()
            .map(|c| (c.recipient.clone(), c.message.clone()))
            .collect()
    }

    /// Wait (real or paused time) until at least `n` calls were recorded.
    pub async fn wait_for_calls(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.calls.lock().len() >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.calls.lock().len() >= n
    }
}

#[async_trait]
impl DeliveryClient for RecordingClient {
    async fn deliver(&self, recipient: &Recipient, message: &str) -> Result<(), DeliveryError> {
        let ok = !self
            .failures
            .contains(&(recipient.as_str().to_string(), message.to_string()));

        self.calls.lock().push(Call {
            recipient: recipient.as_str().to_string(),
            message: message.to_string(),
            at: Instant::now(),
            ok,
        });

        if ok {
            Ok(())
        } else {
            Err(DeliveryError::Other(format!("refused {} to {}", message, recipient)))
        }
    }
}

pub fn pair(recipient: &str, message: &str) -> (String, String) {
    (recipient.to_string(), message.to_string())
}

pub fn in_pacing_range(gap: Duration) -> bool {
    gap >= Duration::from_millis(10_000) && gap <= Duration::from_millis(15_001)
}
