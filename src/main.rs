use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use photo_booth::app_state::{AppState, Integrations};
use photo_booth::config::styles::StyleTable;
use photo_booth::config::AppConfig;
use photo_booth::routes;
use photo_booth::services::{
    inference::ReplicateClient,
    job_store::JobStore,
    mask::{AzureFaceDetector, MaskGenerator},
    orchestrator::SwapOrchestrator,
    storage::R2ImageStore,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing photo-booth server");

    let prometheus_handle =
        routes::metrics::install_recorder().expect("Failed to install Prometheus metrics recorder");

    // Character styles are validated up front so a bad template fails startup
    let styles = match &config.styles_file {
        Some(path) => {
            tracing::info!(path = %path, "Loading character styles from file");
            StyleTable::from_json_file(path).expect("Failed to load styles file")
        }
        None => StyleTable::builtin(&config.default_character),
    };
    styles.validate().expect("Invalid character style table");
    tracing::info!(
        characters = styles.len(),
        default = %styles.default_key(),
        "Character styles loaded"
    );
    let styles = Arc::new(styles);

    tracing::info!("Initializing R2 image store");
    let storage = R2ImageStore::new(
        &config.r2_bucket,
        &config.r2_endpoint,
        &config.r2_access_key,
        &config.r2_secret_key,
        &config.r2_public_url,
    )
    .expect("Failed to initialize R2 image store");

    let inference = ReplicateClient::new(
        &config.replicate_api_url,
        &config.replicate_api_token,
        &config.replicate_model,
    )
    .with_style_inputs(config.replicate_style_inputs);
    tracing::info!(model = %inference.model(), "Replicate client initialized");

    let masks = match config.face_api() {
        Some((endpoint, key)) => {
            tracing::info!("Face mask generation enabled");
            MaskGenerator::new(Arc::new(AzureFaceDetector::new(endpoint, key)))
        }
        None => {
            tracing::warn!("FACE_API_ENDPOINT/FACE_API_KEY not set, face masks disabled");
            MaskGenerator::disabled()
        }
    };

    let integrations = Integrations {
        storage: true,
        inference: !config.replicate_api_token.is_empty(),
        face_detection: masks.is_enabled(),
    };

    let orchestrator = SwapOrchestrator::new(
        Arc::new(storage),
        Arc::new(masks),
        Arc::new(inference),
        styles.clone(),
        Arc::new(JobStore::new()),
    )
    .with_weight(config.swap_weight);

    let state = AppState::new(orchestrator, styles, integrations);

    let app = routes::api_router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        // Json extractor limit (defaults to 2 MB)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(CatchPanicLayer::new());

    tracing::info!("Starting photo-booth on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
