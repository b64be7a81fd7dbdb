use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use axum::routing::{get, post};
use axum::{middleware, Router};
use reqwest::Client;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::health::{health, health_detailed};
use crate::api::reports::{generate_report, report_status, ReportPipeline};
use crate::config::settings::SettingsConfig;
use crate::config::upstreams::ServiceConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::orchestrator::orchestrator::UploadOrchestrator;
use crate::renderer::crystal::CrystalRenderer;
use crate::resilience::retry::RetrySettings;
use crate::server::auth::require_api_key;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub pipeline: Arc<ReportPipeline>,
    pub api_key: Option<Arc<str>>,
    pub platform_url: Arc<str>,
    pub probe_client: Client,
    pub started_at: Instant,
    /// cancelled on shutdown; in-flight uploads stop before their next step
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(metrics: &Metrics, config: &ServiceConfig, shutdown: CancellationToken) -> Result<Self> {
        let client = build_client(&config.settings)?;

        let pipeline = ReportPipeline {
            renderer: CrystalRenderer::new(client.clone(), config.renderer.clone()),
            orchestrator: UploadOrchestrator::from_config(client.clone(), &config.identity, &config.platform),
            retry: RetrySettings::from(config.settings.retry.as_ref()),
        };

        Ok(Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            pipeline: Arc::new(pipeline),
            api_key: config.settings.api_key.as_deref().map(Arc::from),
            platform_url: Arc::from(config.platform.base_url.as_str()),
            probe_client: client,
            started_at: Instant::now(),
            shutdown,
        })
    }
}

/// One client for every outbound call; the timeout bounds each IFS step.
pub fn build_client(settings: &SettingsConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(settings.request_timeout_ms))
        .connect_timeout(Duration::from_millis(settings.request_timeout_ms.min(10_000)))
        .build()
        .map_err(|e| anyhow!("failed to build HTTP client: {}", e))
}

pub fn router(state: AppState, settings: &SettingsConfig) -> Router {
    let reports = Router::new()
        .route("/api/reports", post(generate_report))
        .route("/api/reports/status", get(report_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .merge(reports)
        .route("/health", get(health))
        .route("/health/detailed", get(health_detailed))
        .merge(state.metrics_state.router(&settings.metrics))
        .with_state(state)
}

/// Serve until `shutdown` is cancelled, then finish in-flight requests.
pub async fn start(config: &ServiceConfig, shutdown: CancellationToken) -> Result<()> {
    let metrics = get_metrics().await;
    let state = AppState::new(metrics, config, shutdown.clone())?;
    let app = router(state, &config.settings);

    let address = format!("{}:{}", config.settings.server.host, config.settings.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow!("cannot bind {}: {}", address, e))?;
    info!("ReportForge server running on http://{}", address);
    info!("Crystal Reports Server: {}", config.renderer.server_url);
    info!("IFS Cloud: {}", config.platform.base_url);

    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    metrics.up.set(0);
    info!("HTTP server closed");

    Ok(())
}
