/// Document types carried inside signed resources
///
/// Parsing is tolerant of extra fields (clients may extend documents) but
/// the fields the protocol depends on are required and typed. The parsed
/// form is only used for inspection; the stored bytes stay verbatim.
use crate::error::{RegistryError, RegistryResult};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One entry of an agent's ordered key list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEntry {
    pub key: String,
    pub kind: String,
}

/// An agent (or server) identity document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDoc {
    pub did: String,
    pub changed: String,
    pub signer: String,
    pub keys: Vec<KeyEntry>,
    /// Delegation metadata for hid namespaces; opaque to the core
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuants: Option<serde_json::Value>,
}

impl AgentDoc {
    /// Key at a declared index, base64url encoded
    pub fn key_at(&self, index: usize) -> RegistryResult<&str> {
        self.keys
            .get(index)
            .map(|entry| entry.key.as_str())
            .ok_or_else(|| {
                RegistryError::KeyIndex(format!(
                    "index {} out of range for agent {} with {} key(s)",
                    index,
                    self.did,
                    self.keys.len()
                ))
            })
    }
}

/// A thing (asset) document, signed on its behalf by a delegated agent key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThingDoc {
    pub did: String,
    /// Human-facing secondary identifier, may be empty
    #[serde(default)]
    pub hid: String,
    pub signer: String,
    pub changed: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A point-to-point message between agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDoc {
    pub uid: String,
    pub to: String,
    pub from: String,
    pub signer: String,
    pub date: Option<String>,
    pub subject: Option<String>,
    pub content: Option<String>,
}

/// The offer payload as submitted by the thing's current holder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferPayload {
    pub uid: String,
    pub thing: String,
    pub aspirant: String,
    /// Seconds the offer stays open
    pub duration: f64,
}

/// The server-co-signed offer as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerOffer {
    pub uid: String,
    pub thing: String,
    pub aspirant: String,
    pub duration: f64,
    /// ISO-8601 expiration computed server-side as now + duration
    pub expiration: String,
    /// Server key reference that co-signed this offer
    pub signer: String,
    /// Owning key reference at offer time
    pub offerer: String,
    /// base64url of the original offer request bytes
    pub offer: String,
}

/// A location ping submitted by a gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackDoc {
    /// Ephemeral id, lowercase hex
    pub eid: String,
    /// Opaque location string
    pub loc: String,
    /// Gateway-side ISO-8601 timestamp
    pub dts: String,
}

/// A track entry as stored: server timestamps wrapped around the payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTrack {
    /// Server creation time, microseconds since epoch
    pub create: i64,
    /// Server expiration time, microseconds since epoch
    pub expire: i64,
    pub track: TrackDoc,
}

/// Parse an ISO-8601 `changed` stamp
pub fn parse_changed(changed: &str) -> RegistryResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(changed).map_err(|e| {
        RegistryError::Validation(format!("invalid changed stamp '{}': {}", changed, e))
    })
}
