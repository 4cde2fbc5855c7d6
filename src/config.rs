/// Configuration management for the Sigil trust registry
use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub keys: KeyConfig,
    pub tracks: TrackConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub registry_db: PathBuf,
}

/// Server key configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Hex-encoded 32-byte Ed25519 seed for the server identity.
    /// When absent, an ephemeral key is generated at startup.
    pub server_seed: Option<String>,
}

/// Track recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Seconds a track entry stays live before its indexed expiry
    pub expiration_delay: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Upper bound on the track expiration delay, in seconds (ten years).
/// Keeps `create + delay` inside the representable microsecond range.
const MAX_TRACK_EXPIRATION_DELAY_SECS: u64 = 315_360_000;

impl RegistryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> RegistryResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("REGISTRY_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("REGISTRY_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| RegistryError::Validation("Invalid port number".to_string()))?;
        let version = env::var("REGISTRY_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("REGISTRY_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let registry_db = env::var("REGISTRY_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("registry.sqlite"));

        let server_seed = env::var("REGISTRY_SERVER_SEED_HEX").ok();

        let expiration_delay = env::var("REGISTRY_TRACK_EXPIRATION_DELAY")
            .unwrap_or_else(|_| "43200".to_string())
            .parse()
            .unwrap_or(43200);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(RegistryConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                registry_db,
            },
            keys: KeyConfig { server_seed },
            tracks: TrackConfig { expiration_delay },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> RegistryResult<()> {
        if self.service.hostname.is_empty() {
            return Err(RegistryError::Validation(
                "Hostname cannot be empty".to_string(),
            ));
        }

        if let Some(seed) = &self.keys.server_seed {
            let decoded = hex::decode(seed).map_err(|_| {
                RegistryError::Validation("Server seed must be valid hex".to_string())
            })?;
            if decoded.len() != 32 {
                return Err(RegistryError::Validation(
                    "Server seed must be exactly 32 bytes".to_string(),
                ));
            }
        }

        if self.tracks.expiration_delay == 0 {
            return Err(RegistryError::Validation(
                "Track expiration delay must be positive".to_string(),
            ));
        }
        if self.tracks.expiration_delay > MAX_TRACK_EXPIRATION_DELAY_SECS {
            return Err(RegistryError::Validation(format!(
                "Track expiration delay may not exceed {} seconds",
                MAX_TRACK_EXPIRATION_DELAY_SECS
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> RegistryConfig {
        RegistryConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8080,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                registry_db: "./data/registry.sqlite".into(),
            },
            keys: KeyConfig { server_seed: None },
            tracks: TrackConfig {
                expiration_delay: 43200,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_track_delay() {
        let mut config = base_config();
        config.tracks.expiration_delay = 0;
        assert!(config.validate().is_err());

        // a delay that would wrap the microsecond arithmetic is refused
        config.tracks.expiration_delay = u64::MAX;
        assert!(config.validate().is_err());

        config.tracks.expiration_delay = MAX_TRACK_EXPIRATION_DELAY_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_seed() {
        let mut config = base_config();
        config.keys.server_seed = Some("abcd".to_string());
        assert!(config.validate().is_err());
        config.keys.server_seed =
            Some("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60".to_string());
        assert!(config.validate().is_ok());
    }
}
