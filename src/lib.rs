/// Sigil Registry - signed-resource trust registry
///
/// A store of cryptographically self-describing identity (Agent), asset
/// (Thing), inter-agent message, ownership-transfer offer, and ephemeral
/// location (Track) records. Every admission and mutation is gated on
/// signature-chain verification: self-signed registration, delegated
/// dual-signing for assets, and two-signature continuity proofs for key
/// rotation and ownership updates.
pub mod api;
pub mod config;
pub mod context;
pub mod crypto;
pub mod did;
pub mod error;
pub mod exchange;
pub mod offers;
pub mod registry;
pub mod server;
pub mod store;
pub mod tracks;
pub mod validate;
