/// Storage layer data models
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A stored signed resource: parsed document, exact stored bytes, signature
///
/// `ser` is always the exact serialization that was signature-verified at
/// write time; documents are never re-serialized before storage.
#[derive(Debug, Clone)]
pub struct StoredResource {
    pub dat: Value,
    pub ser: String,
    pub sig: String,
}

/// Latest-offer pointer for a thing
#[derive(Debug, Clone, PartialEq)]
pub struct OfferPointer {
    pub offer_key: String,
    pub expire: DateTime<Utc>,
}

/// Expiry index row for tracks
#[derive(Debug, Clone, PartialEq)]
pub struct TrackExpiry {
    pub expire: i64,
    pub eid: String,
}
