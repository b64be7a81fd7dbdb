use std::time::Duration;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use http::StatusCode;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::server::server::AppState;
use crate::utils::constants::{HEALTH_PROBE_TIMEOUT_MS, SERVICE_NAME, SERVICE_VERSION};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyChecks {
    pub crystal_server: ProbeStatus,
    pub ifs_cloud: ProbeStatus,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub success: bool,
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub uptime: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<DependencyChecks>,
}

impl HealthReport {
    fn new(state: &AppState) -> Self {
        Self {
            success: true,
            status: "healthy",
            service: SERVICE_NAME,
            version: SERVICE_VERSION,
            timestamp: Utc::now().to_rfc3339(),
            uptime: state.started_at.elapsed().as_secs_f64(),
            checks: None,
        }
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport::new(&state))
}

/// GET /health/detailed: also probes Crystal and IFS.
pub async fn health_detailed(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let (crystal_server, ifs_cloud) = tokio::join!(
        probe(&state.probe_client, state.pipeline.renderer.server_url()),
        probe(&state.probe_client, &state.platform_url),
    );

    let mut report = HealthReport::new(&state);
    if crystal_server == ProbeStatus::Unhealthy || ifs_cloud == ProbeStatus::Unhealthy {
        report.status = "degraded";
    }
    report.checks = Some(DependencyChecks {
        crystal_server,
        ifs_cloud,
    });
    (StatusCode::OK, Json(report))
}

async fn probe(client: &Client, url: &str) -> ProbeStatus {
    match client
        .get(url)
        .timeout(Duration::from_millis(HEALTH_PROBE_TIMEOUT_MS))
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => ProbeStatus::Healthy,
        Ok(response) => {
            debug!("probe {} answered {}", url, response.status());
            ProbeStatus::Unhealthy
        }
        Err(e) => {
            debug!("probe {} failed: {}", url, e);
            ProbeStatus::Unhealthy
        }
    }
}
