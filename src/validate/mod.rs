/// Signed-resource validators
///
/// Every admission and mutation decision lives here. Validators are pure
/// with respect to the store: prerequisite documents (stored predecessors,
/// resolved signer agents) are handed in by the caller, and no function in
/// this module performs a write. The caller commits only after validation
/// succeeds - create-only for new identifiers, overwrite for verified
/// mutations, never the reverse.
pub mod documents;

pub use documents::{
    parse_changed, AgentDoc, KeyEntry, MessageDoc, OfferPayload, ServerOffer, StoredTrack,
    ThingDoc, TrackDoc,
};

use crate::{
    crypto::{self, ServerKeeper},
    did::{Did, SignerRef},
    error::{RegistryError, RegistryResult},
};
use base64::{engine::general_purpose::URL_SAFE, Engine};
use chrono::{DateTime, Duration, SecondsFormat, Timelike, Utc};

/// Longest transfer window an offer may declare, in seconds (one year).
/// Keeps `now + duration` inside the representable timestamp range.
pub const MAX_OFFER_DURATION_SECS: f64 = 31_536_000.0;

/// Resolve the key authorized to mutate a resource from its predecessor's
/// signer reference
///
/// Works for both agents (the reference points into the agent's own key
/// list) and things (the reference points into the delegated signer agent's
/// key list); `agent` must already be the resolved, re-verified signer.
pub fn resolve_authorizing_key<'a>(
    agent: &'a AgentDoc,
    predecessor_signer: &str,
) -> RegistryResult<&'a str> {
    let sref = SignerRef::parse(predecessor_signer)?;
    if sref.did != agent.did {
        return Err(RegistryError::Validation(format!(
            "signer reference '{}' does not match resolved agent {}",
            predecessor_signer, agent.did
        )));
    }
    agent.key_at(sref.index)
}

/// Verify a delegated signature against an agent's indexed key
pub fn verify_delegated(
    agent: &AgentDoc,
    index: usize,
    sig: &str,
    ser: &str,
) -> RegistryResult<()> {
    let key = agent.key_at(index)?;
    if !crypto::verify_b64(sig, ser, key)? {
        return Err(RegistryError::Validation(format!(
            "signature does not verify against key {}#{}",
            agent.did, index
        )));
    }
    Ok(())
}

/// Validate a self-signed agent registration
///
/// The DID itself must resolve to the key that verifies the submitted bytes,
/// and the declared signer must reference that key within the document's own
/// key list.
pub fn validate_agent_reg(sig: &str, ser: &str) -> RegistryResult<AgentDoc> {
    let dat: AgentDoc = serde_json::from_str(ser)
        .map_err(|e| RegistryError::Validation(format!("invalid agent document: {}", e)))?;

    let did = Did::parse(&dat.did)?;
    parse_changed(&dat.changed)?;
    if dat.keys.is_empty() {
        return Err(RegistryError::Validation(
            "agent document has an empty key list".to_string(),
        ));
    }

    let sref = SignerRef::parse(&dat.signer)?;
    if sref.did != dat.did {
        return Err(RegistryError::Validation(
            "registration signer must reference the document's own DID".to_string(),
        ));
    }
    let signer_key = dat.key_at(sref.index)?;
    if signer_key != did.key_b64() {
        return Err(RegistryError::Validation(
            "declared signer key does not match the DID-embedded key".to_string(),
        ));
    }

    if !crypto::verify_b64(sig, ser, did.key_b64())? {
        return Err(RegistryError::Validation(
            "signature does not verify against the DID-embedded key".to_string(),
        ));
    }

    Ok(dat)
}

/// Validate an agent mutation under the two-signature continuity proof
///
/// `csig` must verify against the key presently active in the stored
/// predecessor, `sig` against the key the new document declares current.
/// A stolen new key alone can therefore never hijack the agent.
pub fn validate_agent_update(
    cur: &AgentDoc,
    csig: &str,
    sig: &str,
    ser: &str,
) -> RegistryResult<AgentDoc> {
    let dat: AgentDoc = serde_json::from_str(ser)
        .map_err(|e| RegistryError::Validation(format!("invalid agent document: {}", e)))?;

    if dat.did != cur.did {
        return Err(RegistryError::Validation(
            "update may not change the DID".to_string(),
        ));
    }
    if dat.keys.is_empty() {
        return Err(RegistryError::Validation(
            "agent document has an empty key list".to_string(),
        ));
    }
    if parse_changed(&dat.changed)? <= parse_changed(&cur.changed)? {
        return Err(RegistryError::Validation(
            "changed stamp must advance on update".to_string(),
        ));
    }

    // current: whoever controls the presently active key authorizes this
    let current_key = resolve_authorizing_key(cur, &cur.signer)?;
    if !crypto::verify_b64(csig, ser, current_key)? {
        return Err(RegistryError::Validation(
            "current signature does not verify against the active key".to_string(),
        ));
    }

    // signer: the key that will be current after this update
    let sref = SignerRef::parse(&dat.signer)?;
    if sref.did != dat.did {
        return Err(RegistryError::Validation(
            "agent signer must reference its own DID".to_string(),
        ));
    }
    let new_key = dat.key_at(sref.index)?;
    if !crypto::verify_b64(sig, ser, new_key)? {
        return Err(RegistryError::Validation(
            "signer signature does not verify against the declared key".to_string(),
        ));
    }

    Ok(dat)
}

/// Validate the DID-ownership half of a thing registration
///
/// Proves the registrant controls the thing's own DID key and that a
/// well-formed delegated signer is declared. The delegated half is verified
/// separately via [`verify_delegated`] once the caller has resolved the
/// signer agent.
pub fn validate_thing_reg(dsig: &str, ser: &str) -> RegistryResult<ThingDoc> {
    let dat: ThingDoc = serde_json::from_str(ser)
        .map_err(|e| RegistryError::Validation(format!("invalid thing document: {}", e)))?;

    let did = Did::parse(&dat.did)?;
    parse_changed(&dat.changed)?;
    SignerRef::parse(&dat.signer)?;

    if !crypto::verify_b64(dsig, ser, did.key_b64())? {
        return Err(RegistryError::Validation(
            "did signature does not verify against the thing's DID key".to_string(),
        ));
    }

    Ok(dat)
}

/// Validate a thing mutation under the continuity proof
///
/// The authorizing key comes from the *stored predecessor's* signer
/// reference, resolved against `signer_agent` - never from the new
/// document, which an attacker controls.
pub fn validate_thing_update(
    signer_agent: &AgentDoc,
    cur: &ThingDoc,
    csig: &str,
    sig: &str,
    ser: &str,
) -> RegistryResult<ThingDoc> {
    let current_key = resolve_authorizing_key(signer_agent, &cur.signer)?;
    if !crypto::verify_b64(csig, ser, current_key)? {
        return Err(RegistryError::Validation(
            "current signature does not verify against the owner's key".to_string(),
        ));
    }

    let dat: ThingDoc = serde_json::from_str(ser)
        .map_err(|e| RegistryError::Validation(format!("invalid thing document: {}", e)))?;

    if dat.did != cur.did {
        return Err(RegistryError::Validation(
            "update may not change the DID".to_string(),
        ));
    }
    if parse_changed(&dat.changed)? <= parse_changed(&cur.changed)? {
        return Err(RegistryError::Validation(
            "changed stamp must advance on update".to_string(),
        ));
    }

    // ownership changes go through offer/accept, not through updates
    let sref = SignerRef::parse(&dat.signer)?;
    if sref.did != signer_agent.did {
        return Err(RegistryError::Validation(
            "thing update may not reassign the signer to another agent".to_string(),
        ));
    }
    let new_key = signer_agent.key_at(sref.index)?;
    if !crypto::verify_b64(sig, ser, new_key)? {
        return Err(RegistryError::Validation(
            "signer signature does not verify against the declared key".to_string(),
        ));
    }

    Ok(dat)
}

/// Structural validation of a message document
pub fn validate_message(ser: &str) -> RegistryResult<MessageDoc> {
    let dat: MessageDoc = serde_json::from_str(ser)
        .map_err(|e| RegistryError::Validation(format!("invalid message document: {}", e)))?;

    if dat.uid.is_empty() {
        return Err(RegistryError::Validation(
            "message uid must not be empty".to_string(),
        ));
    }
    Did::parse(&dat.to)?;
    Did::parse(&dat.from)?;
    SignerRef::parse(&dat.signer)?;

    Ok(dat)
}

/// Validate an offer payload and the holder's signature over it
pub fn validate_offer(
    holder: &AgentDoc,
    thing: &ThingDoc,
    sig: &str,
    ser: &str,
) -> RegistryResult<OfferPayload> {
    let dat: OfferPayload = serde_json::from_str(ser)
        .map_err(|e| RegistryError::Validation(format!("invalid offer document: {}", e)))?;

    if dat.thing != thing.did {
        return Err(RegistryError::Validation(
            "offer thing field does not match the thing under offer".to_string(),
        ));
    }
    Did::parse(&dat.aspirant)?;
    if !dat.duration.is_finite() || dat.duration <= 0.0 {
        return Err(RegistryError::Validation(
            "offer duration must be a positive number of seconds".to_string(),
        ));
    }
    if dat.duration > MAX_OFFER_DURATION_SECS {
        return Err(RegistryError::Validation(format!(
            "offer duration may not exceed {} seconds",
            MAX_OFFER_DURATION_SECS
        )));
    }

    // mirrors the thing-update continuity check: only the current owner
    // can open a transfer window
    let key = resolve_authorizing_key(holder, &thing.signer)?;
    if !crypto::verify_b64(sig, ser, key)? {
        return Err(RegistryError::Validation(
            "offer signature does not verify against the owning key".to_string(),
        ));
    }

    Ok(dat)
}

/// Build the server-co-signed offer document
///
/// Expiration is computed server-side as `now + duration`; the original
/// request bytes ride along base64url encoded so the offerer's signature
/// stays re-verifiable. Returns the document, its serialization, and the
/// server signature; this is the one place the core serializes a document
/// itself, because the server is the author.
pub fn build_server_offer(
    payload: &OfferPayload,
    request_ser: &str,
    thing: &ThingDoc,
    keeper: &ServerKeeper,
    now: DateTime<Utc>,
) -> (ServerOffer, String, String, DateTime<Utc>) {
    let expiration = now + Duration::microseconds((payload.duration * 1_000_000.0) as i64);
    // truncate to the precision of the stored expiration string, so the
    // indexed copy and the re-parsed copy compare equal on acceptance
    let expiration = expiration
        .with_nanosecond(expiration.nanosecond() / 1_000 * 1_000)
        .unwrap_or(expiration);
    let odat = ServerOffer {
        uid: payload.uid.clone(),
        thing: payload.thing.clone(),
        aspirant: payload.aspirant.clone(),
        duration: payload.duration,
        expiration: expiration.to_rfc3339_opts(SecondsFormat::Micros, true),
        signer: keeper.signer_ref(),
        offerer: thing.signer.clone(),
        offer: URL_SAFE.encode(request_ser),
    };
    let oser = serde_json::to_string(&odat).expect("offer document serializes");
    let osig = keeper.sign_b64(&oser);
    (odat, oser, osig, expiration)
}

/// Validate the thing document submitted on offer acceptance
///
/// The new document must target the thing under transfer, declare the
/// recorded aspirant as its new signer, and verify against the aspirant's
/// referenced key.
pub fn validate_thing_transfer(
    aspirant: &AgentDoc,
    thing_did: &str,
    sig: &str,
    ser: &str,
) -> RegistryResult<ThingDoc> {
    let dat: ThingDoc = serde_json::from_str(ser)
        .map_err(|e| RegistryError::Validation(format!("invalid thing document: {}", e)))?;

    if dat.did != thing_did {
        return Err(RegistryError::Validation(
            "transfer document does not target the thing under transfer".to_string(),
        ));
    }
    parse_changed(&dat.changed)?;

    let sref = SignerRef::parse(&dat.signer)?;
    if sref.did != aspirant.did {
        return Err(RegistryError::Validation(
            "new signer must be the offer's recorded aspirant".to_string(),
        ));
    }
    let key = aspirant.key_at(sref.index)?;
    if !crypto::verify_b64(sig, ser, key)? {
        return Err(RegistryError::Validation(
            "transfer signature does not verify against the aspirant's key".to_string(),
        ));
    }

    Ok(dat)
}

/// Structural validation of a track payload
pub fn validate_track(ser: &str) -> RegistryResult<TrackDoc> {
    let dat: TrackDoc = serde_json::from_str(ser)
        .map_err(|e| RegistryError::Validation(format!("invalid track document: {}", e)))?;

    if dat.eid.is_empty() || !dat.eid.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()) {
        return Err(RegistryError::Validation(
            "track eid must be lowercase hex".to_string(),
        ));
    }
    if dat.loc.is_empty() {
        return Err(RegistryError::Validation(
            "track loc must not be empty".to_string(),
        ));
    }
    DateTime::parse_from_rfc3339(&dat.dts)
        .map_err(|e| RegistryError::Validation(format!("invalid track dts: {}", e)))?;

    Ok(dat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{key_b64, sign_b64};
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    /// An agent whose keys we control, for exercising validators
    struct TestAgent {
        keys: Vec<SigningKey>,
        doc: AgentDoc,
        ser: String,
        sig: String,
    }

    fn make_agent() -> TestAgent {
        let key = SigningKey::generate(&mut OsRng);
        let did = Did::from_verifying_key(&key.verifying_key());
        let doc = AgentDoc {
            did: did.clone(),
            changed: "2000-01-01T00:00:00+00:00".to_string(),
            signer: format!("{}#0", did),
            keys: vec![KeyEntry {
                key: key_b64(&key.verifying_key()),
                kind: "EdDSA".to_string(),
            }],
            issuants: None,
        };
        let ser = serde_json::to_string(&doc).unwrap();
        let sig = sign_b64(&key, &ser);
        TestAgent {
            keys: vec![key],
            doc,
            ser,
            sig,
        }
    }

    fn make_thing(owner: &TestAgent) -> (SigningKey, ThingDoc, String, String, String) {
        let key = SigningKey::generate(&mut OsRng);
        let did = Did::from_verifying_key(&key.verifying_key());
        let doc = ThingDoc {
            did: did.clone(),
            hid: "hid:example:thing.1".to_string(),
            signer: format!("{}#0", owner.doc.did),
            changed: "2000-01-01T00:00:00+00:00".to_string(),
            data: None,
        };
        let ser = serde_json::to_string(&doc).unwrap();
        let dsig = sign_b64(&key, &ser);
        let ssig = sign_b64(&owner.keys[0], &ser);
        (key, doc, ser, dsig, ssig)
    }

    #[test]
    fn test_agent_reg_admits_self_signed() {
        let agent = make_agent();
        let dat = validate_agent_reg(&agent.sig, &agent.ser).unwrap();
        assert_eq!(dat.did, agent.doc.did);
    }

    #[test]
    fn test_agent_reg_rejects_foreign_signature() {
        let agent = make_agent();
        let other = SigningKey::generate(&mut OsRng);
        let forged = sign_b64(&other, &agent.ser);
        assert!(matches!(
            validate_agent_reg(&forged, &agent.ser),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_agent_reg_rejects_signer_did_mismatch() {
        let agent = make_agent();
        let other = make_agent();
        let mut doc = agent.doc.clone();
        doc.signer = format!("{}#0", other.doc.did);
        let ser = serde_json::to_string(&doc).unwrap();
        let sig = sign_b64(&agent.keys[0], &ser);
        assert!(matches!(
            validate_agent_reg(&sig, &ser),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_agent_reg_rejects_out_of_range_index() {
        let agent = make_agent();
        let mut doc = agent.doc.clone();
        doc.signer = format!("{}#5", doc.did);
        let ser = serde_json::to_string(&doc).unwrap();
        let sig = sign_b64(&agent.keys[0], &ser);
        assert!(matches!(
            validate_agent_reg(&sig, &ser),
            Err(RegistryError::KeyIndex(_))
        ));
    }

    /// Rotated document: key 1 appended, signer moved to index 1
    fn rotation(agent: &TestAgent) -> (SigningKey, AgentDoc, String) {
        let new_key = SigningKey::generate(&mut OsRng);
        let mut doc = agent.doc.clone();
        doc.changed = "2000-01-01T00:00:01+00:00".to_string();
        doc.keys.push(KeyEntry {
            key: key_b64(&new_key.verifying_key()),
            kind: "EdDSA".to_string(),
        });
        doc.signer = format!("{}#1", doc.did);
        let ser = serde_json::to_string(&doc).unwrap();
        (new_key, doc, ser)
    }

    #[test]
    fn test_agent_update_continuity_proof() {
        let agent = make_agent();
        let (new_key, _, ser) = rotation(&agent);

        let csig = sign_b64(&agent.keys[0], &ser);
        let sig = sign_b64(&new_key, &ser);
        let dat = validate_agent_update(&agent.doc, &csig, &sig, &ser).unwrap();
        assert_eq!(dat.keys.len(), 2);
    }

    #[test]
    fn test_agent_update_rejects_without_current_key() {
        let agent = make_agent();
        let (new_key, _, ser) = rotation(&agent);

        // both signatures from the new key: the thief has the new key but
        // not the currently active one
        let csig = sign_b64(&new_key, &ser);
        let sig = sign_b64(&new_key, &ser);
        assert!(matches!(
            validate_agent_update(&agent.doc, &csig, &sig, &ser),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_agent_update_rejects_stale_changed() {
        let agent = make_agent();
        let (new_key, mut doc, _) = rotation(&agent);
        doc.changed = agent.doc.changed.clone();
        let ser = serde_json::to_string(&doc).unwrap();
        let csig = sign_b64(&agent.keys[0], &ser);
        let sig = sign_b64(&new_key, &ser);
        assert!(matches!(
            validate_agent_update(&agent.doc, &csig, &sig, &ser),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_agent_update_rejects_did_change() {
        let agent = make_agent();
        let other = make_agent();
        let csig = sign_b64(&agent.keys[0], &other.ser);
        assert!(matches!(
            validate_agent_update(&agent.doc, &csig, &other.sig, &other.ser),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_thing_reg_dual_signatures() {
        let owner = make_agent();
        let (_, doc, ser, dsig, ssig) = make_thing(&owner);

        let dat = validate_thing_reg(&dsig, &ser).unwrap();
        assert_eq!(dat.did, doc.did);
        let sref = SignerRef::parse(&dat.signer).unwrap();
        verify_delegated(&owner.doc, sref.index, &ssig, &ser).unwrap();
    }

    #[test]
    fn test_thing_reg_rejects_bad_did_signature() {
        let owner = make_agent();
        let (_, _, ser, _, ssig) = make_thing(&owner);
        // the delegated signature is not the DID self-signature
        assert!(matches!(
            validate_thing_reg(&ssig, &ser),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_delegated_key_index_out_of_range() {
        let owner = make_agent();
        let (_, _, ser, _, ssig) = make_thing(&owner);
        assert!(matches!(
            verify_delegated(&owner.doc, 3, &ssig, &ser),
            Err(RegistryError::KeyIndex(_))
        ));
    }

    #[test]
    fn test_thing_update_scoped_to_stored_owner() {
        let owner = make_agent();
        let (_, doc, _, _, _) = make_thing(&owner);

        let mut updated = doc.clone();
        updated.changed = "2000-01-01T00:00:01+00:00".to_string();
        updated.data = Some(serde_json::json!({"color": "indigo"}));
        let ser = serde_json::to_string(&updated).unwrap();
        let csig = sign_b64(&owner.keys[0], &ser);
        let sig = sign_b64(&owner.keys[0], &ser);

        let dat = validate_thing_update(&owner.doc, &doc, &csig, &sig, &ser).unwrap();
        assert_eq!(dat.data.unwrap()["color"], "indigo");

        // an intruder agent signing both halves is still rejected because
        // the authorizing key is resolved from the stored predecessor
        let intruder = make_agent();
        let icsig = sign_b64(&intruder.keys[0], &ser);
        let isig = sign_b64(&intruder.keys[0], &ser);
        assert!(validate_thing_update(&owner.doc, &doc, &icsig, &isig, &ser).is_err());
    }

    #[test]
    fn test_thing_update_rejects_owner_reassignment() {
        let owner = make_agent();
        let stranger = make_agent();
        let (_, doc, _, _, _) = make_thing(&owner);

        let mut updated = doc.clone();
        updated.changed = "2000-01-01T00:00:01+00:00".to_string();
        updated.signer = format!("{}#0", stranger.doc.did);
        let ser = serde_json::to_string(&updated).unwrap();
        let csig = sign_b64(&owner.keys[0], &ser);
        let sig = sign_b64(&stranger.keys[0], &ser);
        assert!(matches!(
            validate_thing_update(&owner.doc, &doc, &csig, &sig, &ser),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_message_structural_checks() {
        let sender = make_agent();
        let recipient = make_agent();
        let msg = MessageDoc {
            uid: "m_00035d2976e6a000_26ace93".to_string(),
            to: recipient.doc.did.clone(),
            from: sender.doc.did.clone(),
            signer: format!("{}#0", sender.doc.did),
            date: Some("2000-01-03T00:00:00+00:00".to_string()),
            subject: Some("Hello".to_string()),
            content: Some("test message".to_string()),
        };
        let ser = serde_json::to_string(&msg).unwrap();
        let dat = validate_message(&ser).unwrap();
        assert_eq!(dat.uid, msg.uid);

        let sig = sign_b64(&sender.keys[0], &ser);
        verify_delegated(&sender.doc, 0, &sig, &ser).unwrap();

        // empty uid is structural, not cryptographic
        let bad = ser.replace(&msg.uid, "");
        assert!(matches!(
            validate_message(&bad),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_offer_validation_and_server_co_signing() {
        let owner = make_agent();
        let aspirant = make_agent();
        let (_, thing, _, _, _) = make_thing(&owner);

        let payload = OfferPayload {
            uid: "o_00035d2976e6a000_26ace93".to_string(),
            thing: thing.did.clone(),
            aspirant: aspirant.doc.did.clone(),
            duration: 120.0,
        };
        let ser = serde_json::to_string(&payload).unwrap();
        let sig = sign_b64(&owner.keys[0], &ser);

        let dat = validate_offer(&owner.doc, &thing, &sig, &ser).unwrap();
        assert_eq!(dat.aspirant, aspirant.doc.did);

        // a non-owner cannot open an offer
        let forged = sign_b64(&aspirant.keys[0], &ser);
        assert!(validate_offer(&owner.doc, &thing, &forged, &ser).is_err());

        let keeper = ServerKeeper::generate();
        let now = Utc::now();
        let (odat, oser, osig, expiration) =
            build_server_offer(&payload, &ser, &thing, &keeper, now);
        assert_eq!(odat.offerer, thing.signer);
        assert_eq!(odat.signer, keeper.signer_ref());
        let want = now + Duration::microseconds(120_000_000);
        let want = want.with_nanosecond(want.nanosecond() / 1_000 * 1_000).unwrap();
        assert_eq!(expiration, want);
        assert_eq!(odat.expiration, expiration.to_rfc3339_opts(SecondsFormat::Micros, true));
        assert_eq!(URL_SAFE.decode(&odat.offer).unwrap(), ser.as_bytes());
        assert!(crypto::verify_b64(&osig, &oser, &key_b64(&keeper.verifying_key())).unwrap());
    }

    #[test]
    fn test_offer_rejects_nonpositive_duration() {
        let owner = make_agent();
        let aspirant = make_agent();
        let (_, thing, _, _, _) = make_thing(&owner);
        let payload = OfferPayload {
            uid: "o1".to_string(),
            thing: thing.did.clone(),
            aspirant: aspirant.doc.did.clone(),
            duration: 0.0,
        };
        let ser = serde_json::to_string(&payload).unwrap();
        let sig = sign_b64(&owner.keys[0], &ser);
        assert!(matches!(
            validate_offer(&owner.doc, &thing, &sig, &ser),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_offer_rejects_excessive_duration() {
        let owner = make_agent();
        let aspirant = make_agent();
        let (_, thing, _, _, _) = make_thing(&owner);
        // a window this large would push the computed expiration out of
        // the representable timestamp range; it must fail as a typed
        // validation error, never reach the expiration arithmetic
        let payload = OfferPayload {
            uid: "o1".to_string(),
            thing: thing.did.clone(),
            aspirant: aspirant.doc.did.clone(),
            duration: 1.0e18,
        };
        let ser = serde_json::to_string(&payload).unwrap();
        let sig = sign_b64(&owner.keys[0], &ser);
        assert!(matches!(
            validate_offer(&owner.doc, &thing, &sig, &ser),
            Err(RegistryError::Validation(_))
        ));
        // the boundary value itself is accepted
        let payload = OfferPayload {
            uid: "o2".to_string(),
            thing: thing.did.clone(),
            aspirant: aspirant.doc.did.clone(),
            duration: MAX_OFFER_DURATION_SECS,
        };
        let ser = serde_json::to_string(&payload).unwrap();
        let sig = sign_b64(&owner.keys[0], &ser);
        assert!(validate_offer(&owner.doc, &thing, &sig, &ser).is_ok());
    }

    #[test]
    fn test_thing_transfer_requires_aspirant_key() {
        let owner = make_agent();
        let aspirant = make_agent();
        let (_, thing, _, _, _) = make_thing(&owner);

        let mut transferred = thing.clone();
        transferred.signer = format!("{}#0", aspirant.doc.did);
        transferred.changed = "2000-01-01T00:00:02+00:00".to_string();
        let ser = serde_json::to_string(&transferred).unwrap();

        let sig = sign_b64(&aspirant.keys[0], &ser);
        let dat = validate_thing_transfer(&aspirant.doc, &thing.did, &sig, &ser).unwrap();
        assert_eq!(SignerRef::parse(&dat.signer).unwrap().did, aspirant.doc.did);

        // old owner cannot sign the transfer on the aspirant's behalf
        let forged = sign_b64(&owner.keys[0], &ser);
        assert!(validate_thing_transfer(&aspirant.doc, &thing.did, &forged, &ser).is_err());

        // document keeping the old owner as signer is rejected
        let stale_ser = serde_json::to_string(&thing).unwrap();
        let stale_sig = sign_b64(&aspirant.keys[0], &stale_ser);
        assert!(
            validate_thing_transfer(&aspirant.doc, &thing.did, &stale_sig, &stale_ser).is_err()
        );
    }

    #[test]
    fn test_track_shape() {
        let ser = r#"{"eid":"abcdef0123456789","loc":"1111222233334444","dts":"2000-01-01T00:36:00+00:00"}"#;
        let dat = validate_track(ser).unwrap();
        assert_eq!(dat.eid, "abcdef0123456789");

        for bad in [
            r#"{"eid":"","loc":"a","dts":"2000-01-01T00:36:00+00:00"}"#,
            r#"{"eid":"ABCDEF","loc":"a","dts":"2000-01-01T00:36:00+00:00"}"#,
            r#"{"eid":"abcd","loc":"","dts":"2000-01-01T00:36:00+00:00"}"#,
            r#"{"eid":"abcd","loc":"a","dts":"not-a-date"}"#,
            r#"{"loc":"a","dts":"2000-01-01T00:36:00+00:00"}"#,
        ] {
            assert!(validate_track(bad).is_err(), "accepted {}", bad);
        }
    }
}
