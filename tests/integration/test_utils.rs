//! Shared helpers for integration tests

use async_trait::async_trait;
use datatag::platform::{ManualClock, Platform, SeededRandom};
use datatag::{DataTaggingManager, KeyValueStore, TaggingConfig, Transport, TransportError};
use parking_lot::Mutex;
use std::sync::Arc;

/// 2023-11-14T22:13:20Z
pub const NOW: u64 = 1_700_000_000_000;

pub type Query = Vec<(String, String)>;

/// Records every GET instead of sending it. Calls listed in `fail_calls`
/// (0-based) return an error after being recorded.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Query>>,
    fail_calls: Vec<usize>,
}

impl RecordingTransport {
    pub fn failing_on(fail_calls: Vec<usize>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_calls,
        }
    }

    pub fn sent(&self) -> Vec<Query> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn get(&self, _url: &str, query: &[(&'static str, String)]) -> Result<(), TransportError> {
        let mut sent = self.sent.lock();
        let call = sent.len();
        sent.push(query.iter().map(|(k, v)| (k.to_string(), v.clone())).collect());
        if self.fail_calls.contains(&call) {
            return Err(TransportError::Status(503));
        }
        Ok(())
    }
}

pub fn param(query: &Query, key: &str) -> String {
    query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .unwrap_or_else(|| panic!("missing query param {}", key))
}

pub fn test_config() -> TaggingConfig {
    TaggingConfig::new("https://collector.test/mpua").with_user_agent("ua-test")
}

pub fn test_platform(clock: Arc<ManualClock>) -> Platform {
    Platform::new("ios", clock, Arc::new(SeededRandom::new(11)))
}

pub fn recording_manager(
    storage: Arc<dyn KeyValueStore>,
    transport: Arc<RecordingTransport>,
    clock: Arc<ManualClock>,
) -> DataTaggingManager {
    DataTaggingManager::new(test_config(), storage, transport, test_platform(clock)).unwrap()
}
