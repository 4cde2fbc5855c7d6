/// Resource store over SQLite
///
/// Durable key -> (document, serialization, signature) mapping plus the two
/// secondary indexes (latest offer per thing, track expiry order). Single-key
/// put/get are atomic; cross-key sequences are deliberately not wrapped in a
/// transaction (see the offer machinery for the documented race).
pub mod models;

pub use models::{OfferPointer, StoredResource, TrackExpiry};

use crate::{
    crypto,
    did::Did,
    error::{RegistryError, RegistryResult},
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use std::path::Path;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> RegistryResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = SqlitePool::connect_with(
        sqlx::sqlite::SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(if options.enable_wal {
                sqlx::sqlite::SqliteJournalMode::Wal
            } else {
                sqlx::sqlite::SqliteJournalMode::Delete
            })
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5)),
    )
    .await
    .map_err(RegistryError::Database)?;

    Ok(pool)
}

/// Resource store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Create a store and ensure its schema exists
    pub async fn new(pool: SqlitePool) -> RegistryResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resource (
                key TEXT PRIMARY KEY NOT NULL,
                ser TEXT NOT NULL,
                sig TEXT NOT NULL,
                indexed_at DATETIME NOT NULL
            );

            CREATE TABLE IF NOT EXISTS offer_index (
                thing_did TEXT PRIMARY KEY NOT NULL,
                offer_key TEXT NOT NULL,
                expire DATETIME NOT NULL
            );

            CREATE TABLE IF NOT EXISTS hid (
                hid TEXT PRIMARY KEY NOT NULL,
                did TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS track (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                eid TEXT NOT NULL,
                body TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_track_eid ON track(eid);

            CREATE TABLE IF NOT EXISTS track_expiry (
                expire INTEGER NOT NULL,
                eid TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_track_expiry ON track_expiry(expire);
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Write a signed resource
    ///
    /// `clobber = false` is a create-only write: an existing key surfaces as
    /// `DuplicateKey`. `clobber = true` overwrites unconditionally.
    pub async fn put_signed(
        &self,
        key: &str,
        ser: &str,
        sig: &str,
        clobber: bool,
    ) -> RegistryResult<()> {
        let query = if clobber {
            sqlx::query(
                "INSERT INTO resource (key, ser, sig, indexed_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                    ser = excluded.ser,
                    sig = excluded.sig,
                    indexed_at = excluded.indexed_at",
            )
        } else {
            sqlx::query(
                "INSERT INTO resource (key, ser, sig, indexed_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )
        };

        query
            .bind(key)
            .bind(ser)
            .bind(sig)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    RegistryError::DuplicateKey(key.to_string())
                }
                _ => RegistryError::Database(e),
            })?;

        Ok(())
    }

    /// Point lookup of a signed resource
    ///
    /// Returns the stored serialization verbatim; no verification is re-run
    /// here - callers re-verify downstream if they care.
    pub async fn get_signed(&self, key: &str) -> RegistryResult<StoredResource> {
        let row = sqlx::query("SELECT ser, sig FROM resource WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))?;

        let ser: String = row.get("ser");
        let sig: String = row.get("sig");
        let dat = serde_json::from_str(&ser).map_err(|e| {
            RegistryError::Internal(format!("stored resource at '{}' is not JSON: {}", key, e))
        })?;

        Ok(StoredResource { dat, ser, sig })
    }

    /// Point lookup that re-verifies the stored self-signature
    ///
    /// Prerequisite lookups for mutations go through here so a corrupted or
    /// tampered predecessor can never authorize anything.
    pub async fn get_self_signed(&self, did: &str) -> RegistryResult<StoredResource> {
        let resource = self.get_signed(did).await?;
        let parsed = Did::parse(did)?;
        if !crypto::verify_b64(&resource.sig, &resource.ser, parsed.key_b64())? {
            return Err(RegistryError::Validation(format!(
                "stored resource at '{}' failed self-signature re-verification",
                did
            )));
        }
        Ok(resource)
    }

    /// Point the latest-offer index for a thing at a new offer
    pub async fn put_offer_index(
        &self,
        thing_did: &str,
        offer_key: &str,
        expire: DateTime<Utc>,
    ) -> RegistryResult<()> {
        sqlx::query(
            "INSERT INTO offer_index (thing_did, offer_key, expire)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(thing_did) DO UPDATE SET
                offer_key = excluded.offer_key,
                expire = excluded.expire",
        )
        .bind(thing_did)
        .bind(offer_key)
        .bind(expire)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Latest-offer pointer for a thing, if any offer was ever made
    pub async fn get_offer_index(&self, thing_did: &str) -> RegistryResult<Option<OfferPointer>> {
        let row = sqlx::query("SELECT offer_key, expire FROM offer_index WHERE thing_did = ?1")
            .bind(thing_did)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| OfferPointer {
            offer_key: row.get("offer_key"),
            expire: row.get("expire"),
        }))
    }

    /// Record a hid -> did alias for lookup by human-facing identifier
    pub async fn put_hid(&self, hid: &str, did: &str) -> RegistryResult<()> {
        sqlx::query(
            "INSERT INTO hid (hid, did) VALUES (?1, ?2)
             ON CONFLICT(hid) DO UPDATE SET did = excluded.did",
        )
        .bind(hid)
        .bind(did)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Resolve a hid alias to a thing DID
    pub async fn get_hid(&self, hid: &str) -> RegistryResult<String> {
        let did: Option<String> = sqlx::query_scalar("SELECT did FROM hid WHERE hid = ?1")
            .bind(hid)
            .fetch_optional(&self.pool)
            .await?;

        did.ok_or_else(|| RegistryError::NotFound(format!("hid '{}'", hid)))
    }

    /// Append a track entry under its eid; entries accumulate, never clobber
    pub async fn append_track(&self, eid: &str, body: &str) -> RegistryResult<()> {
        sqlx::query("INSERT INTO track (eid, body) VALUES (?1, ?2)")
            .bind(eid)
            .bind(body)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// All track entries for an eid in insertion order
    pub async fn get_tracks(&self, eid: &str) -> RegistryResult<Vec<serde_json::Value>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT body FROM track WHERE eid = ?1 ORDER BY id ASC")
                .bind(eid)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|body| {
                serde_json::from_str(&body).map_err(|e| {
                    RegistryError::Internal(format!("stored track for '{}' is not JSON: {}", eid, e))
                })
            })
            .collect()
    }

    /// Insert a track expiry index row
    pub async fn put_track_expiry(&self, expire: i64, eid: &str) -> RegistryResult<()> {
        sqlx::query("INSERT INTO track_expiry (expire, eid) VALUES (?1, ?2)")
            .bind(expire)
            .bind(eid)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Expiry-ordered scan of track index rows at or before a cutoff
    ///
    /// This layer only maintains the index; sweeping is an external
    /// process's job.
    pub async fn tracks_expiring_by(&self, cutoff: i64) -> RegistryResult<Vec<TrackExpiry>> {
        let rows = sqlx::query(
            "SELECT expire, eid FROM track_expiry WHERE expire <= ?1 ORDER BY expire ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TrackExpiry {
                expire: row.get("expire"),
                eid: row.get("eid"),
            })
            .collect())
    }
}
