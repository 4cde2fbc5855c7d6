/// Agent and thing registration service
///
/// Glue between the pure validators and the store: fetches prerequisite
/// documents, runs admission or continuity checks, and commits only after
/// validation succeeds. Creates are create-only writes, verified mutations
/// are overwrites, never the reverse.
use crate::{
    did::{Did, SignerRef},
    error::{RegistryError, RegistryResult},
    store::{Store, StoredResource},
    validate::{self, AgentDoc, ThingDoc},
};
use std::sync::Arc;

pub struct Registry {
    store: Arc<Store>,
}

impl Registry {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Register a new self-signed agent
    pub async fn register_agent(&self, ser: &str, sig: &str) -> RegistryResult<AgentDoc> {
        let dat = validate::validate_agent_reg(sig, ser)?;
        self.store.put_signed(&dat.did, ser, sig, false).await?;
        tracing::info!(did = %dat.did, "registered agent");
        Ok(dat)
    }

    /// Mutate an existing agent under the two-signature continuity proof
    pub async fn update_agent(
        &self,
        did: &str,
        ser: &str,
        sig: &str,
        csig: &str,
    ) -> RegistryResult<AgentDoc> {
        let stored = self.store.get_self_signed(did).await?;
        let cur: AgentDoc = serde_json::from_str(&stored.ser).map_err(|e| {
            RegistryError::Internal(format!("stored agent '{}' unparseable: {}", did, e))
        })?;

        let dat = validate::validate_agent_update(&cur, csig, sig, ser)?;
        self.store.put_signed(did, ser, sig, true).await?;
        tracing::info!(did = %did, "updated agent");
        Ok(dat)
    }

    /// Fetch an agent resource, re-verifying its self-signature
    pub async fn get_agent(&self, did: &str) -> RegistryResult<StoredResource> {
        self.store.get_self_signed(did).await
    }

    /// Register a new dual-signed thing
    ///
    /// `dsig` proves control of the thing's own DID key; `ssig` is the
    /// delegated authorization by the declared signer agent.
    pub async fn register_thing(
        &self,
        ser: &str,
        dsig: &str,
        ssig: &str,
    ) -> RegistryResult<ThingDoc> {
        let dat = validate::validate_thing_reg(dsig, ser)?;

        let sref = SignerRef::parse(&dat.signer)?;
        let signer = self.store.get_self_signed(&sref.did).await?;
        let signer: AgentDoc = serde_json::from_str(&signer.ser).map_err(|e| {
            RegistryError::Internal(format!("stored agent '{}' unparseable: {}", sref.did, e))
        })?;
        validate::verify_delegated(&signer, sref.index, ssig, ser)?;

        // the stored signature is the delegated one, matching the owner key
        // the resource's signer field points at
        self.store.put_signed(&dat.did, ser, ssig, false).await?;
        if !dat.hid.is_empty() {
            self.store.put_hid(&dat.hid, &dat.did).await?;
        }
        tracing::info!(did = %dat.did, signer = %dat.signer, "registered thing");
        Ok(dat)
    }

    /// Mutate an existing thing under the continuity proof
    ///
    /// The signer agent is re-resolved from the stored predecessor on every
    /// call; no key is cached across requests, so concurrent rotation is
    /// tolerated.
    pub async fn update_thing(
        &self,
        did: &str,
        ser: &str,
        sig: &str,
        csig: &str,
    ) -> RegistryResult<ThingDoc> {
        Did::parse(did)?;
        let stored = self.store.get_signed(did).await?;
        let cur: ThingDoc = serde_json::from_str(&stored.ser).map_err(|e| {
            RegistryError::Internal(format!("stored thing '{}' unparseable: {}", did, e))
        })?;

        let sref = SignerRef::parse(&cur.signer)?;
        let signer = self.store.get_self_signed(&sref.did).await?;
        let signer: AgentDoc = serde_json::from_str(&signer.ser).map_err(|e| {
            RegistryError::Internal(format!("stored agent '{}' unparseable: {}", sref.did, e))
        })?;

        let dat = validate::validate_thing_update(&signer, &cur, csig, sig, ser)?;
        self.store.put_signed(did, ser, sig, true).await?;
        if !dat.hid.is_empty() && dat.hid != cur.hid {
            self.store.put_hid(&dat.hid, did).await?;
        }
        tracing::info!(did = %did, "updated thing");
        Ok(dat)
    }

    /// Fetch a thing resource; no verification is re-run on reads
    pub async fn get_thing(&self, did: &str) -> RegistryResult<StoredResource> {
        self.store.get_signed(did).await
    }

    /// Fetch a thing resource by its human-facing identifier
    pub async fn get_thing_by_hid(&self, hid: &str) -> RegistryResult<StoredResource> {
        let did = self.store.get_hid(hid).await?;
        self.store.get_signed(&did).await
    }
}
