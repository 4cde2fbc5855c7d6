/// Agent endpoints: registration, key rotation, message drop
use crate::{
    api::middleware::{parse_signature_header, require_sig, signed_response},
    context::AppContext,
    error::RegistryResult,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;

/// Build agent routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/agent", post(register_agent).get(get_agent))
        .route("/agent/:did", put(update_agent).get(get_agent_by_did))
        .route("/agent/:did/drop", post(drop_message).get(fetch_message))
}

/// Query parameters for GET /agent
#[derive(Debug, Deserialize)]
struct GetAgentQuery {
    did: String,
}

/// Query parameters for GET /agent/:did/drop
#[derive(Debug, Deserialize)]
struct FetchMessageQuery {
    from: String,
    uid: String,
}

/// Register a new self-signed agent
async fn register_agent(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: String,
) -> RegistryResult<Response> {
    let sigs = parse_signature_header(&headers);
    let sig = require_sig(&sigs, "signer")?;

    let dat = ctx.registry.register_agent(&body, &sig).await?;

    let location = format!("/agent?did={}", urlencoding::encode(&dat.did));
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(dat),
    )
        .into_response())
}

/// Fetch an agent resource by query parameter
async fn get_agent(
    State(ctx): State<AppContext>,
    Query(query): Query<GetAgentQuery>,
) -> RegistryResult<Response> {
    let resource = ctx.registry.get_agent(&query.did).await?;
    Ok(signed_response(resource))
}

/// Fetch an agent resource by path
async fn get_agent_by_did(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
) -> RegistryResult<Response> {
    let resource = ctx.registry.get_agent(&did).await?;
    Ok(signed_response(resource))
}

/// Mutate an agent under the two-signature continuity proof
async fn update_agent(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
    headers: HeaderMap,
    body: String,
) -> RegistryResult<Response> {
    let sigs = parse_signature_header(&headers);
    let sig = require_sig(&sigs, "signer")?;
    let csig = require_sig(&sigs, "current")?;

    ctx.registry.update_agent(&did, &body, &sig, &csig).await?;

    // echo the accepted bytes back, like any read
    let resource = ctx.registry.get_agent(&did).await?;
    Ok(signed_response(resource))
}

/// Drop a message into an agent's inbox
async fn drop_message(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
    headers: HeaderMap,
    body: String,
) -> RegistryResult<Response> {
    let sigs = parse_signature_header(&headers);
    let sig = require_sig(&sigs, "signer")?;

    let dat = ctx.exchange.drop_message(&did, &body, &sig).await?;

    let location = format!(
        "/agent/{}/drop?from={}&uid={}",
        urlencoding::encode(&did),
        urlencoding::encode(&dat.from),
        dat.uid
    );
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(dat),
    )
        .into_response())
}

/// Fetch a stored message
async fn fetch_message(
    State(ctx): State<AppContext>,
    Path(did): Path<String>,
    Query(query): Query<FetchMessageQuery>,
) -> RegistryResult<Response> {
    let resource = ctx
        .exchange
        .fetch_message(&did, &query.from, &query.uid)
        .await?;
    Ok(signed_response(resource))
}
