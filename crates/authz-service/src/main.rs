use authz_service::config::Config;
use authz_service::keyset::KeySetCache;
use authz_service::observability::metrics::init_metrics_recorder;
use authz_service::pipeline::AuthorizationPipeline;
use authz_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authz_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting authorization service");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(issuer = %config.issuer, "Configuration loaded successfully");

    // Install the Prometheus recorder before any metrics are recorded
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // Build the shared key-set cache and pipeline
    let cache = Arc::new(KeySetCache::new(config.fetch_timeout, config.keyset_ttl)?);
    let pipeline = AuthorizationPipeline::new(cache, &config);

    let bind_address = config.bind_address.clone();

    let state = Arc::new(AppState {
        pipeline,
        metrics: metrics_handle,
    });

    let app = routes::build_routes(state);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Authorization service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
