/// Request helpers shared by the API handlers
///
/// Detached signatures ride in a `Signature` header of the form
/// `signer="<b64>";current="<b64>"`; the request body is the exact bytes
/// that were signed and must reach the validators untouched.
use crate::{
    error::{RegistryError, RegistryResult},
    store::StoredResource,
};
use axum::{
    http::{header, HeaderMap, HeaderName},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

pub const SIGNATURE_HEADER: HeaderName = HeaderName::from_static("signature");

/// Parse the `Signature` header into tag -> base64url signature pairs
pub fn parse_signature_header(headers: &HeaderMap) -> HashMap<String, String> {
    let mut sigs = HashMap::new();
    if let Some(raw) = headers.get(&SIGNATURE_HEADER).and_then(|h| h.to_str().ok()) {
        for clause in raw.split(';') {
            // split at the first '=' only; base64url padding also uses '='
            if let Some((tag, value)) = clause.split_once('=') {
                let tag = tag.trim();
                let value = value.trim().trim_matches('"');
                if !tag.is_empty() && !value.is_empty() {
                    sigs.insert(tag.to_string(), value.to_string());
                }
            }
        }
    }
    sigs
}

/// Require a named signature tag or fail the request
pub fn require_sig(sigs: &HashMap<String, String>, tag: &str) -> RegistryResult<String> {
    sigs.get(tag).cloned().ok_or_else(|| {
        RegistryError::Validation(format!(
            "Invalid or missing Signature header: no '{}' tag",
            tag
        ))
    })
}

/// Response for a stored resource read: the stored serialization verbatim,
/// with the detached signature echoed in the `Signature` header so clients
/// can re-verify what they received.
pub fn signed_response(resource: StoredResource) -> Response {
    (
        [
            (
                header::CONTENT_TYPE,
                "application/json; charset=UTF-8".to_string(),
            ),
            (
                SIGNATURE_HEADER,
                format!("signer=\"{}\"", resource.sig),
            ),
        ],
        resource.ser,
    )
        .into_response()
}
