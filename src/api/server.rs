/// Server endpoints: the registry's own self-signed agent record
use crate::{
    api::middleware::signed_response,
    context::AppContext,
    error::RegistryResult,
};
use axum::{extract::State, response::Response, routing::get, Router};

/// Build server routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/server", get(get_server))
}

/// Fetch the server's own agent resource
async fn get_server(State(ctx): State<AppContext>) -> RegistryResult<Response> {
    let resource = ctx.registry.get_agent(ctx.server_did()).await?;
    Ok(signed_response(resource))
}
