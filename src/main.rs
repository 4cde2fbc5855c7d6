/// Sigil Registry - signed-resource trust registry server
use sigil_registry::{config::RegistryConfig, context::AppContext, error::RegistryResult, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> RegistryResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sigil_registry=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        "Sigil Registry v{} - signed-resource trust registry",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let config = RegistryConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
