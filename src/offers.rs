/// Offer/transfer state machine
///
/// Time-bounded ownership-transfer offers on things. State is never stored:
/// it is derived from (now, the offer's expiration, whether the latest-offer
/// index still points at it), centralized in [`offer_state`] so no two code
/// paths can disagree about what "open" means.
use crate::{
    crypto::ServerKeeper,
    did::{Did, SignerRef},
    error::{RegistryError, RegistryResult},
    store::{Store, StoredResource},
    validate::{self, AgentDoc, ServerOffer, ThingDoc},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Derived offer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferState {
    /// Unexpired and still the latest offer for its thing
    Open,
    /// The latest offer, but its expiration has passed
    Expired,
    /// A newer offer has replaced it in the index
    Superseded,
}

/// Derive an offer's state; the single source of truth for this logic
pub fn offer_state(now: DateTime<Utc>, expiration: DateTime<Utc>, is_latest: bool) -> OfferState {
    if !is_latest {
        OfferState::Superseded
    } else if now <= expiration {
        OfferState::Open
    } else {
        OfferState::Expired
    }
}

/// Storage key for an offer: `{thing}/offer/{uid}`
pub fn offer_key(thing_did: &str, uid: &str) -> String {
    format!("{}/offer/{}", thing_did, uid)
}

pub struct OfferMachine {
    store: Arc<Store>,
    keeper: Arc<ServerKeeper>,
}

impl OfferMachine {
    pub fn new(store: Arc<Store>, keeper: Arc<ServerKeeper>) -> Self {
        Self { store, keeper }
    }

    /// Create a transfer offer on a thing
    ///
    /// Verifies the offerer against the thing's current owning key, rejects
    /// while a prevailing offer is still open, then writes the server-
    /// co-signed offer and moves the latest-offer index to it.
    ///
    /// The open-offer check and the two writes are separate point
    /// operations, not one transaction: two concurrent creations for the
    /// same thing can both pass the check. Known race, accepted by design.
    pub async fn create_offer(
        &self,
        thing_did: &str,
        ser: &str,
        sig: &str,
        now: DateTime<Utc>,
    ) -> RegistryResult<(ServerOffer, String, String)> {
        Did::parse(thing_did)?;
        let thing = self.store.get_signed(thing_did).await?;
        let thing: ThingDoc = serde_json::from_str(&thing.ser).map_err(|e| {
            RegistryError::Internal(format!("stored thing '{}' unparseable: {}", thing_did, e))
        })?;

        let sref = SignerRef::parse(&thing.signer)?;
        let holder = self.store.get_self_signed(&sref.did).await?;
        let holder: AgentDoc = serde_json::from_str(&holder.ser).map_err(|e| {
            RegistryError::Internal(format!("stored agent '{}' unparseable: {}", sref.did, e))
        })?;

        let payload = validate::validate_offer(&holder, &thing, sig, ser)?;

        if let Some(ptr) = self.store.get_offer_index(thing_did).await? {
            if offer_state(now, ptr.expire, true) == OfferState::Open {
                return Err(RegistryError::UnexpiredOffer(thing_did.to_string()));
            }
        }

        let (odat, oser, osig, expiration) =
            validate::build_server_offer(&payload, ser, &thing, &self.keeper, now);

        let key = offer_key(thing_did, &odat.uid);
        self.store.put_signed(&key, &oser, &osig, false).await?;
        self.store
            .put_offer_index(thing_did, &key, expiration)
            .await?;
        tracing::info!(thing = %thing_did, uid = %odat.uid, aspirant = %odat.aspirant,
            "created transfer offer");

        Ok((odat, oser, osig))
    }

    /// Accept a transfer offer, rewriting the thing's ownership
    ///
    /// Fails `ExpiredOffer` past the expiration, `StaleOffer` when the index
    /// has moved on to a newer offer, and `Validation` unless the submitted
    /// thing document is signed by the recorded aspirant's key.
    pub async fn accept_offer(
        &self,
        thing_did: &str,
        uid: &str,
        ser: &str,
        sig: &str,
        now: DateTime<Utc>,
    ) -> RegistryResult<ThingDoc> {
        Did::parse(thing_did)?;
        let key = offer_key(thing_did, uid);
        let stored = self.store.get_signed(&key).await?;
        let odat: ServerOffer = serde_json::from_str(&stored.ser).map_err(|e| {
            RegistryError::Internal(format!("stored offer '{}' unparseable: {}", key, e))
        })?;

        let expiration = DateTime::parse_from_rfc3339(&odat.expiration)
            .map_err(|e| {
                RegistryError::Internal(format!("stored offer '{}' expiration: {}", key, e))
            })?
            .with_timezone(&Utc);

        let ptr = self.store.get_offer_index(thing_did).await?;
        let is_latest = ptr
            .as_ref()
            .map(|p| p.offer_key == key && p.expire == expiration)
            .unwrap_or(false);

        match offer_state(now, expiration, is_latest) {
            OfferState::Expired => return Err(RegistryError::ExpiredOffer(key)),
            OfferState::Superseded => return Err(RegistryError::StaleOffer(key)),
            OfferState::Open => {}
        }

        let aspirant = self.store.get_self_signed(&odat.aspirant).await?;
        let aspirant: AgentDoc = serde_json::from_str(&aspirant.ser).map_err(|e| {
            RegistryError::Internal(format!(
                "stored agent '{}' unparseable: {}",
                odat.aspirant, e
            ))
        })?;

        let dat = validate::validate_thing_transfer(&aspirant, thing_did, sig, ser)?;

        // ownership rewrite; acceptance leaves no record beyond this
        self.store.put_signed(thing_did, ser, sig, true).await?;
        tracing::info!(thing = %thing_did, uid = %uid, new_owner = %dat.signer,
            "accepted transfer offer");
        Ok(dat)
    }

    /// Fetch a stored offer; pure lookup
    pub async fn get_offer(&self, thing_did: &str, uid: &str) -> RegistryResult<StoredResource> {
        self.store.get_signed(&offer_key(thing_did, uid)).await
    }
}
