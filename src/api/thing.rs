/// Thing endpoints: registration, update, transfer offers and acceptance
use crate::{
    api::middleware::{parse_signature_header, require_sig, signed_response},
    context::AppContext,
    error::{RegistryError, RegistryResult},
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

/// Build thing routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/thing", post(register_thing).get(get_thing))
        .route("/thing/:did", put(update_thing).get(get_thing_by_did))
        .route("/thing/:did/offer", post(create_offer).get(get_offer))
        .route("/thing/:did/accept", post(accept_offer))
}

/// Query parameters for GET /thing: lookup by did or by hid alias
#[derive(Debug, Deserialize)]
struct GetThingQuery {
    did: Option<String>,
    hid: Option<String>,
}

/// Query parameters for offer lookup and acceptance
#[derive(Debug, Deserialize)]
struct OfferUidQuery {
    uid: String,
}

/// Register a new dual-signed thing
async fn register_thing(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: String,
) -> RegistryResult<Response> {
    let sigs = parse_signature_header(&headers);
    let dsig = require_sig(&sigs, "did")?;
    let ssig = require_sig(&sigs, "signer")?;

    let dat = ctx.registry.register_thing(&body, &dsig, &ssig).await?;

    let location = format!("/thing?did={}", urlencoding::encode(&dat.did));
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(dat),
    )
        .into_response())
}

/// Fetch a thing resource by did or hid query parameter
async fn get_thing(
    State(ctx): State<AppContext>,
    Query(query): Query<GetThingQuery>,
) -> RegistryResult<Response> {
    let resource = match (&query.did, &query.hid) {
        (Some(did), _) => ctx.registry.get_thing(did).await?,
        (None, Some(hid)) => ctx.registry.get_thing_by_hid(hid).await?,
        (None, None) => {
            return Err(RegistryError::Validation(
                "either did or hid query parameter is required".to_string(),
            ))
        }
    };
    Ok(signed_response(resource))
}

/// Fetch a thing resource by path
async fn get_thing_by_did(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
) -> RegistryResult<Response> {
    let resource = ctx.registry.get_thing(&did).await?;
    Ok(signed_response(resource))
}

/// Mutate a thing under the continuity proof
async fn update_thing(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
    headers: HeaderMap,
    body: String,
) -> RegistryResult<Response> {
    let sigs = parse_signature_header(&headers);
    let sig = require_sig(&sigs, "signer")?;
    let csig = require_sig(&sigs, "current")?;

    ctx.registry.update_thing(&did, &body, &sig, &csig).await?;

    let resource = ctx.registry.get_thing(&did).await?;
    Ok(signed_response(resource))
}

/// Open a transfer offer on a thing
async fn create_offer(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
    headers: HeaderMap,
    body: String,
) -> RegistryResult<Response> {
    let sigs = parse_signature_header(&headers);
    let sig = require_sig(&sigs, "signer")?;

    let (odat, _, _) = ctx.offers.create_offer(&did, &body, &sig, Utc::now()).await?;

    let location = format!(
        "/thing/{}/offer?uid={}",
        urlencoding::encode(&did),
        odat.uid
    );
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(odat),
    )
        .into_response())
}

/// Fetch a stored offer
async fn get_offer(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
    Query(query): Query<OfferUidQuery>,
) -> RegistryResult<Response> {
    let resource = ctx.offers.get_offer(&did, &query.uid).await?;
    Ok(signed_response(resource))
}

/// Accept a transfer offer, rewriting the thing's ownership
async fn accept_offer(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
    Query(query): Query<OfferUidQuery>,
    headers: HeaderMap,
    body: String,
) -> RegistryResult<Response> {
    let sigs = parse_signature_header(&headers);
    let sig = require_sig(&sigs, "signer")?;

    let dat = ctx
        .offers
        .accept_offer(&did, &query.uid, &body, &sig, Utc::now())
        .await?;

    let location = format!("/thing/{}", urlencoding::encode(&did));
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(dat),
    )
        .into_response())
}
