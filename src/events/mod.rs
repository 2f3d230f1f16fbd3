//! Events Module
//!
//! Structured records of cache activity and the sink interface the cache
//! reports them through.
//!
//! # Sinks
//! - [`BufferedEventWriter`]: batches events as JSON lines into any writer

mod writer;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::crypto::{CacheId, Intent};

pub use writer::BufferedEventWriter;

// == Cache Event ==
/// A single cache occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEvent {
    pub timestamp: DateTime<Utc>,
    pub cache_id: CacheId,
    #[serde(flatten)]
    pub kind: CacheEventKind,
}

impl CacheEvent {
    pub fn new(cache_id: CacheId, kind: CacheEventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            cache_id,
            kind,
        }
    }
}

/// What happened, tagged as `event` when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CacheEventKind {
    Added { key: String, intent: Intent },
    DuplicateRejected { key: String, intent: Intent },
    Uncacheable { algorithm: String, intent: Intent },
    Hit { key: String, intent: Intent },
    Miss { key: String, intent: Intent },
    Removed { key: String, intent: Intent },
    RemoveRejected { intent: Intent, reason: RemoveRejection },
    Expired { key: String, intent: Intent },
    Disposed { released: usize },
}

/// Why a removal did not take place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveRejection {
    /// The provider is owned by another cache or by none
    NotOwned,
    /// No live entry held this provider
    NotPresent,
}

// == Event Sink ==
/// Receiver of cache events.
///
/// Implementations must not block for long; they run on the caller's thread.
pub trait EventSink: Send + Sync {
    fn record(&self, event: CacheEvent);
}
