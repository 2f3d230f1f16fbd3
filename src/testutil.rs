//! Test doubles for keys, providers and event sinks.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::crypto::{OwnerMark, SecurityKey, SignatureProvider};
use crate::events::{CacheEvent, EventSink};

/// Key whose internal id is given directly.
#[derive(Debug, Clone)]
pub struct TestKey {
    internal_id: String,
}

impl TestKey {
    pub fn new(internal_id: &str) -> Self {
        Self {
            internal_id: internal_id.to_string(),
        }
    }
}

impl SecurityKey for TestKey {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// Provider reporting a configurable type name.
#[derive(Debug)]
pub struct TestProvider {
    key: TestKey,
    algorithm: String,
    provider_type: String,
    will_create_signatures: bool,
    owner: OwnerMark,
}

impl TestProvider {
    pub fn new(
        internal_id: &str,
        algorithm: &str,
        provider_type: &str,
        will_create_signatures: bool,
    ) -> Self {
        Self {
            key: TestKey::new(internal_id),
            algorithm: algorithm.to_string(),
            provider_type: provider_type.to_string(),
            will_create_signatures,
            owner: OwnerMark::new(),
        }
    }
}

impl SignatureProvider for TestProvider {
    fn key(&self) -> &dyn SecurityKey {
        &self.key
    }

    fn algorithm(&self) -> &str {
        &self.algorithm
    }

    fn provider_type(&self) -> &str {
        &self.provider_type
    }

    fn will_create_signatures(&self) -> bool {
        self.will_create_signatures
    }

    fn owner(&self) -> &OwnerMark {
        &self.owner
    }
}

pub fn provider(
    internal_id: &str,
    algorithm: &str,
    provider_type: &str,
    will_create_signatures: bool,
) -> Arc<dyn SignatureProvider> {
    Arc::new(TestProvider::new(
        internal_id,
        algorithm,
        provider_type,
        will_create_signatures,
    ))
}

/// Sink keeping every event in memory.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<CacheEvent>>,
}

impl CollectingSink {
    /// The serialized `event` tag of each recorded event, in order.
    pub fn event_names(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| {
                serde_json::to_value(event)
                    .ok()
                    .and_then(|json| json["event"].as_str().map(str::to_string))
            })
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn record(&self, event: CacheEvent) {
        self.events.lock().push(event);
    }
}
