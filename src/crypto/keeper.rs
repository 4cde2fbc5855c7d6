/// Server keeper - the privileged singleton Server identity
///
/// Holds the process-wide Ed25519 signing key. It is injected through the
/// application context rather than read from global state so the offer
/// machinery stays testable in isolation.
use crate::{
    crypto,
    did::Did,
    error::{RegistryError, RegistryResult},
    store::Store,
    validate::{AgentDoc, KeyEntry},
};
use chrono::{SecondsFormat, Utc};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;

pub struct ServerKeeper {
    signing_key: SigningKey,
    did: String,
}

impl ServerKeeper {
    /// Create a keeper from a hex-encoded 32-byte seed
    pub fn from_seed_hex(seed_hex: &str) -> RegistryResult<Self> {
        let seed = hex::decode(seed_hex)
            .map_err(|e| RegistryError::InvalidEncoding(format!("server seed: {}", e)))?;
        let seed: [u8; 32] = seed.try_into().map_err(|_| {
            RegistryError::InvalidEncoding("server seed must be 32 bytes".to_string())
        })?;
        Ok(Self::from_signing_key(SigningKey::from_bytes(&seed)))
    }

    /// Generate a fresh keeper (first boot without a configured seed)
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let did = Did::from_verifying_key(&signing_key.verifying_key());
        Self { signing_key, did }
    }

    /// The server's own DID
    pub fn did(&self) -> &str {
        &self.did
    }

    /// Signer reference for the server key, always index 0
    pub fn signer_ref(&self) -> String {
        format!("{}#0", self.did)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Detached base64url signature with the server key
    pub fn sign_b64(&self, message: &str) -> String {
        crypto::sign_b64(&self.signing_key, message)
    }

    /// Build the server's self-signed agent document
    pub fn agent_document(&self) -> (AgentDoc, String, String) {
        let dat = AgentDoc {
            did: self.did.clone(),
            changed: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            signer: self.signer_ref(),
            keys: vec![KeyEntry {
                key: crypto::key_b64(&self.signing_key.verifying_key()),
                kind: "EdDSA".to_string(),
            }],
            issuants: None,
        };
        // the server is the author here, so serializing server-side is safe
        let ser = serde_json::to_string(&dat).expect("agent document serializes");
        let sig = self.sign_b64(&ser);
        (dat, ser, sig)
    }

    /// Write the server's self-signed agent record if it is not yet stored
    pub async fn ensure_registered(&self, store: &Store) -> RegistryResult<()> {
        match store.get_signed(&self.did).await {
            Ok(_) => Ok(()),
            Err(RegistryError::NotFound(_)) => {
                let (_, ser, sig) = self.agent_document();
                match store.put_signed(&self.did, &ser, &sig, false).await {
                    Ok(()) => {
                        tracing::info!(did = %self.did, "registered server agent record");
                        Ok(())
                    }
                    // lost a startup race with another process, record exists
                    Err(RegistryError::DuplicateKey(_)) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}
