/// Unified error types for the Sigil trust registry
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// DID string does not conform to the did:igo wire format
    #[error("Malformed DID: {0}")]
    MalformedDid(String),

    /// Signature or key material is not decodable (structural, not cryptographic)
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Signature or structural validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// Document lacks a well-formed `signer` field
    #[error("Missing or invalid signer field: {0}")]
    MissingSigner(String),

    /// Signer key index out of range for the resolved agent
    #[error("Key index error: {0}")]
    KeyIndex(String),

    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Create-only write collided with an existing key
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A prevailing offer on the thing has not yet expired
    #[error("Unexpired prevailing offer on {0}")]
    UnexpiredOffer(String),

    /// The offer being accepted has expired
    #[error("Expired offer: {0}")]
    ExpiredOffer(String),

    /// The offer being accepted is no longer the latest for its thing
    #[error("Not latest offer: {0}")]
    StaleOffer(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body surfaced at the HTTP boundary
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert RegistryError to HTTP response
impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            RegistryError::MalformedDid(_) => {
                (StatusCode::BAD_REQUEST, "MalformedDid", self.to_string())
            }
            RegistryError::InvalidEncoding(_) => {
                (StatusCode::BAD_REQUEST, "InvalidEncoding", self.to_string())
            }
            RegistryError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "ValidationError", self.to_string())
            }
            RegistryError::MissingSigner(_) => {
                (StatusCode::BAD_REQUEST, "MissingSigner", self.to_string())
            }
            RegistryError::KeyIndex(_) => {
                (StatusCode::FAILED_DEPENDENCY, "KeyIndexError", self.to_string())
            }
            RegistryError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NotFound", self.to_string())
            }
            // a create-only collision means the caller's precondition
            // ("this identifier is unused") failed
            RegistryError::DuplicateKey(_) => (
                StatusCode::PRECONDITION_FAILED,
                "DuplicateKey",
                self.to_string(),
            ),
            RegistryError::UnexpiredOffer(_) => {
                (StatusCode::BAD_REQUEST, "UnexpiredOffer", self.to_string())
            }
            RegistryError::ExpiredOffer(_) => {
                (StatusCode::BAD_REQUEST, "ExpiredOffer", self.to_string())
            }
            RegistryError::StaleOffer(_) => {
                (StatusCode::BAD_REQUEST, "StaleOffer", self.to_string())
            }
            RegistryError::Database(_) | RegistryError::Internal(_) | RegistryError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                RegistryError::MalformedDid("d".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                RegistryError::NotFound("k".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                RegistryError::DuplicateKey("k".to_string()),
                StatusCode::PRECONDITION_FAILED,
            ),
            (
                RegistryError::KeyIndex("i".to_string()),
                StatusCode::FAILED_DEPENDENCY,
            ),
            (
                RegistryError::UnexpiredOffer("t".to_string()),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let resp = RegistryError::Internal("secret path".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
