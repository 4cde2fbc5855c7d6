/// Track endpoints: record and read ephemeral location pings
use crate::{context::AppContext, error::RegistryResult};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

/// Build track routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/track", post(record_track).get(fetch_tracks))
}

/// Query parameters for GET /track
#[derive(Debug, Deserialize)]
struct FetchTracksQuery {
    eid: String,
}

/// Record one track ping; no signature, tracks are ephemeral and unsigned
async fn record_track(State(ctx): State<AppContext>, body: String) -> RegistryResult<Response> {
    let sdat = ctx.tracks.record(&body, Utc::now()).await?;

    let location = format!("/track?eid={}", sdat.track.eid);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(sdat),
    )
        .into_response())
}

/// Fetch all pings for an eid in submission order
async fn fetch_tracks(
    State(ctx): State<AppContext>,
    Query(query): Query<FetchTracksQuery>,
) -> RegistryResult<Json<Vec<serde_json::Value>>> {
    let tracks = ctx.tracks.fetch(&query.eid).await?;
    Ok(Json(tracks))
}
