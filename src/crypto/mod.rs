/// Cryptographic primitives: detached Ed25519 signatures and the server keeper
pub mod keeper;

pub use keeper::ServerKeeper;

use crate::error::{RegistryError, RegistryResult};
use base64::{engine::general_purpose::URL_SAFE, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

/// Verify a detached base64url signature over a serialized document
///
/// Returns `Ok(false)` on cryptographic mismatch. Errors only when the
/// signature or key text is not structurally decodable.
pub fn verify_b64(sig_b64: &str, message: &str, key_b64: &str) -> RegistryResult<bool> {
    let sig = URL_SAFE
        .decode(sig_b64)
        .map_err(|e| RegistryError::InvalidEncoding(format!("signature: {}", e)))?;
    let sig = Signature::from_slice(&sig)
        .map_err(|e| RegistryError::InvalidEncoding(format!("signature: {}", e)))?;

    let key = URL_SAFE
        .decode(key_b64)
        .map_err(|e| RegistryError::InvalidEncoding(format!("key: {}", e)))?;
    let key: [u8; 32] = key
        .try_into()
        .map_err(|_| RegistryError::InvalidEncoding("key must be 32 bytes".to_string()))?;
    let key = VerifyingKey::from_bytes(&key)
        .map_err(|e| RegistryError::InvalidEncoding(format!("key: {}", e)))?;

    Ok(key.verify_strict(message.as_bytes(), &sig).is_ok())
}

/// Produce a detached base64url signature over a serialized document
pub fn sign_b64(key: &SigningKey, message: &str) -> String {
    URL_SAFE.encode(key.sign(message.as_bytes()).to_bytes())
}

/// Base64url encoding of a public key, as carried in agent key lists
pub fn key_b64(key: &VerifyingKey) -> String {
    URL_SAFE.encode(key.to_bytes())
}
