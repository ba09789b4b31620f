use crate::cli::ServeArgs;
use crate::infra::{pack_registry, AppState};
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use otc_flow::config::AppConfig;
use otc_flow::error::AppError;
use otc_flow::telemetry;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let registry = pack_registry(config.rules.clone(), args.rules.take());
    let app_state = AppState::new(registry.clone(), prometheus_handle);

    // Stay up on a rejected bundle; /ready reports 503 until a reload verifies.
    match registry.load().await {
        Ok(catalog) => {
            app_state.readiness.store(true, Ordering::Release);
            info!(packs = catalog.len(), source = %registry.location(), "rule packs loaded");
        }
        Err(error) => {
            warn!(error = %error, source = %registry.location(), "starting without rule packs");
        }
    }

    let app = with_platform_routes(&app_state)
        .layer(Extension(app_state.clone()))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(?config.environment, %addr, "otc flow decision support ready");

    axum::serve(listener, app).await?;
    Ok(())
}
