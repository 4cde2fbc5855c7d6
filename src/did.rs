/// DID codec for the did:igo method
///
/// A did:igo identifier embeds the Ed25519 public key of the entity in the
/// identifier itself, base64url encoded. Decoding is deterministic and pure;
/// anything malformed is rejected before any signature check runs.
use crate::error::{RegistryError, RegistryResult};
use base64::{engine::general_purpose::URL_SAFE, Engine};
use ed25519_dalek::VerifyingKey;

/// The only DID method this registry admits
pub const DID_METHOD: &str = "igo";

/// A decoded DID: method tag plus the embedded public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Did {
    method: String,
    key_b64: String,
}

impl Did {
    /// Parse and validate a DID string
    ///
    /// Rejects wrong prefix, wrong method, a key that is not valid base64url,
    /// and key material that is not exactly 32 bytes of a valid Ed25519 point.
    pub fn parse(did: &str) -> RegistryResult<Self> {
        let mut parts = did.splitn(3, ':');
        let scheme = parts.next().unwrap_or_default();
        let method = parts
            .next()
            .ok_or_else(|| RegistryError::MalformedDid(did.to_string()))?;
        let key_b64 = parts
            .next()
            .ok_or_else(|| RegistryError::MalformedDid(did.to_string()))?;

        if scheme != "did" || method != DID_METHOD || key_b64.is_empty() {
            return Err(RegistryError::MalformedDid(did.to_string()));
        }

        let raw = URL_SAFE
            .decode(key_b64)
            .map_err(|_| RegistryError::MalformedDid(did.to_string()))?;
        let raw: [u8; 32] = raw
            .try_into()
            .map_err(|_| RegistryError::MalformedDid(did.to_string()))?;
        VerifyingKey::from_bytes(&raw)
            .map_err(|_| RegistryError::MalformedDid(did.to_string()))?;

        Ok(Self {
            method: method.to_string(),
            key_b64: key_b64.to_string(),
        })
    }

    /// Render the DID for a public key
    pub fn from_verifying_key(key: &VerifyingKey) -> String {
        format!("did:{}:{}", DID_METHOD, URL_SAFE.encode(key.to_bytes()))
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The embedded public key, base64url encoded
    pub fn key_b64(&self) -> &str {
        &self.key_b64
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "did:{}:{}", self.method, self.key_b64)
    }
}

/// Reference to a signing key: `did#index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerRef {
    pub did: String,
    pub index: usize,
}

impl SignerRef {
    /// Parse a `signer` field of the form `did#index`
    pub fn parse(signer: &str) -> RegistryResult<Self> {
        let (did, index) = signer.rsplit_once('#').ok_or_else(|| {
            RegistryError::MissingSigner(format!("no key index in '{}'", signer))
        })?;
        let index: usize = index.parse().map_err(|_| {
            RegistryError::MissingSigner(format!("invalid key index in '{}'", signer))
        })?;
        // the referenced agent DID must itself be well formed
        Did::parse(did)?;
        Ok(Self {
            did: did.to_string(),
            index,
        })
    }
}

impl std::fmt::Display for SignerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.did, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    fn sample_did() -> String {
        let key = SigningKey::generate(&mut OsRng);
        Did::from_verifying_key(&key.verifying_key())
    }

    #[test]
    fn test_parse_round_trip() {
        let did = sample_did();
        let parsed = Did::parse(&did).unwrap();
        assert_eq!(parsed.method(), DID_METHOD);
        assert_eq!(parsed.to_string(), did);
        // idempotent: re-parsing the rendered form yields the same value
        assert_eq!(Did::parse(&parsed.to_string()).unwrap(), parsed);
    }

    #[test]
    fn test_parse_rejects_wrong_prefix() {
        let did = sample_did();
        let mangled = did.replacen("did:", "dad:", 1);
        assert!(matches!(
            Did::parse(&mangled),
            Err(RegistryError::MalformedDid(_))
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_method() {
        let did = sample_did();
        let mangled = did.replacen(":igo:", ":web:", 1);
        assert!(matches!(
            Did::parse(&mangled),
            Err(RegistryError::MalformedDid(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_alphabet() {
        assert!(matches!(
            Did::parse("did:igo:not/valid+base64url!!"),
            Err(RegistryError::MalformedDid(_))
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_key_length() {
        let short = format!("did:igo:{}", URL_SAFE.encode([7u8; 16]));
        assert!(matches!(
            Did::parse(&short),
            Err(RegistryError::MalformedDid(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        for bad in ["", "did", "did:igo", "did:igo:"] {
            assert!(Did::parse(bad).is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn test_signer_ref_parse() {
        let did = sample_did();
        let sref = SignerRef::parse(&format!("{}#2", did)).unwrap();
        assert_eq!(sref.did, did);
        assert_eq!(sref.index, 2);
        assert_eq!(sref.to_string(), format!("{}#2", did));
    }

    #[test]
    fn test_signer_ref_rejects_missing_index() {
        let did = sample_did();
        assert!(matches!(
            SignerRef::parse(&did),
            Err(RegistryError::MissingSigner(_))
        ));
        assert!(matches!(
            SignerRef::parse(&format!("{}#x", did)),
            Err(RegistryError::MissingSigner(_))
        ));
    }
}
