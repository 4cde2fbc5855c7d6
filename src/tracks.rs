/// Track recorder for ephemeral location pings
///
/// Tracks are unsigned; the server wraps each payload with its own creation
/// and expiration stamps (microsecond resolution) and keeps an expiry-time
/// index so an external sweeper can purge by age. Entries under one eid
/// accumulate - there is no create-only constraint here.
use crate::{
    error::{RegistryError, RegistryResult},
    store::Store,
    validate::{self, StoredTrack},
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub struct TrackRecorder {
    store: Arc<Store>,
    expiration_delay: Duration,
}

impl TrackRecorder {
    pub fn new(store: Arc<Store>, expiration_delay_secs: u64) -> Self {
        Self {
            store,
            expiration_delay: Duration::seconds(expiration_delay_secs as i64),
        }
    }

    /// Record one ping: append under its eid and index its expiration
    pub async fn record(&self, ser: &str, now: DateTime<Utc>) -> RegistryResult<StoredTrack> {
        let dat = validate::validate_track(ser)?;

        let create = now.timestamp_micros();
        let expire = create
            + self
                .expiration_delay
                .num_microseconds()
                .ok_or_else(|| RegistryError::Internal("track delay overflow".to_string()))?;

        let sdat = StoredTrack {
            create,
            expire,
            track: dat,
        };
        let body = serde_json::to_string(&sdat).expect("track entry serializes");

        self.store.append_track(&sdat.track.eid, &body).await?;
        self.store.put_track_expiry(expire, &sdat.track.eid).await?;
        tracing::debug!(eid = %sdat.track.eid, expire, "recorded track");

        Ok(sdat)
    }

    /// All pings for an eid in submission order
    pub async fn fetch(&self, eid: &str) -> RegistryResult<Vec<serde_json::Value>> {
        let tracks = self.store.get_tracks(eid).await?;
        if tracks.is_empty() {
            return Err(RegistryError::NotFound(format!("track '{}'", eid)));
        }
        Ok(tracks)
    }
}
