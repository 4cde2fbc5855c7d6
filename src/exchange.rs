/// Message exchange between agents
///
/// Immutable point-to-point messages keyed by (recipient, sender, uid).
/// Trust is established entirely at write time; reads hand back the stored
/// bytes without re-running verification.
use crate::{
    did::SignerRef,
    error::{RegistryError, RegistryResult},
    store::{Store, StoredResource},
    validate::{self, AgentDoc, MessageDoc},
};
use std::sync::Arc;

/// Storage key for a message: `{to}/drop/{from}/{uid}`
pub fn message_key(to: &str, from: &str, uid: &str) -> String {
    format!("{}/drop/{}/{}", to, from, uid)
}

pub struct MessageExchange {
    store: Arc<Store>,
}

impl MessageExchange {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Drop a message into a recipient agent's inbox
    ///
    /// Enforces recipient/sender consistency between the document and its
    /// context, verifies the sender's indexed key, and writes create-only:
    /// redelivery of the same (to, from, uid) surfaces as `DuplicateKey`,
    /// which a client may treat as "already delivered".
    pub async fn drop_message(
        &self,
        recipient_did: &str,
        ser: &str,
        sig: &str,
    ) -> RegistryResult<MessageDoc> {
        let dat = validate::validate_message(ser)?;
        if dat.to != recipient_did {
            return Err(RegistryError::Validation(
                "mismatch between message to field and recipient DID".to_string(),
            ));
        }

        let sref = SignerRef::parse(&dat.signer)?;
        let sender = self.store.get_self_signed(&sref.did).await?;
        let sender: AgentDoc = serde_json::from_str(&sender.ser).map_err(|e| {
            RegistryError::Internal(format!("stored agent '{}' unparseable: {}", sref.did, e))
        })?;
        validate::verify_delegated(&sender, sref.index, sig, ser)?;

        if sref.did != dat.from {
            return Err(RegistryError::Validation(
                "mismatch between message from field and signer DID".to_string(),
            ));
        }

        // the recipient must be a registered, verifiable agent
        self.store.get_self_signed(recipient_did).await?;

        let key = message_key(recipient_did, &sref.did, &dat.uid);
        self.store.put_signed(&key, ser, sig, false).await?;
        tracing::info!(to = %recipient_did, from = %sref.did, uid = %dat.uid, "dropped message");
        Ok(dat)
    }

    /// Fetch a stored message; pure lookup
    pub async fn fetch_message(
        &self,
        to: &str,
        from: &str,
        uid: &str,
    ) -> RegistryResult<StoredResource> {
        self.store.get_signed(&message_key(to, from, uid)).await
    }
}
