use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::error::ApiError;
use crate::error::UploadError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::orchestrator::orchestrator::UploadOrchestrator;
use crate::orchestrator::state::{UploadReceipt, UploadRequest};
use crate::renderer::crystal::{CrystalRenderer, RenderJob};
use crate::resilience::retry::RetrySettings;
use crate::server::server::AppState;
use crate::utils::constants::SERVICE_NAME;

/// Request sent by IFS Connect for one print job.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub trace_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub report_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub layout_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub print_job_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub language: Option<String>,
    #[serde(default)]
    pub number_formatting: Option<Value>,
    /// everything else, e.g. invoiceNumber, used as report parameters
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Render, then deliver, with whole-flow retries for transient delivery failures.
pub struct ReportPipeline {
    pub renderer: CrystalRenderer,
    pub orchestrator: UploadOrchestrator,
    pub retry: RetrySettings,
}

impl ReportPipeline {
    pub async fn deliver(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadReceipt, UploadError> {
        self.retry
            .run_with_retry_if(
                || self.orchestrator.upload_with_cancel(request, cancel),
                UploadError::is_retryable,
                cancel,
            )
            .await
    }
}

/// POST /api/reports
pub async fn generate_report(
    State(state): State<AppState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let result = process_report(&state, payload).await;

    let status = match &result {
        Ok(_) => http::StatusCode::OK,
        Err(e) => e.status(),
    };
    get_metrics()
        .await
        .report_requests
        .with_label_values(&[status.as_str()])
        .inc();

    result
}

async fn process_report(
    state: &AppState,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let start = get_instant();
    let Json(request) = payload.map_err(|e| ApiError::InvalidBody(e.body_text()))?;

    info!(
        trace_id = request.trace_id.as_deref().unwrap_or("-"),
        report_key = request.report_key.as_deref().unwrap_or("-"),
        layout_name = request.layout_name.as_deref().unwrap_or("-"),
        print_job_key = request.print_job_key.as_deref().unwrap_or("-"),
        "report generation request received"
    );

    let (trace_id, layout_name, print_job_key) = match (
        non_empty(&request.trace_id),
        non_empty(&request.layout_name),
        non_empty(&request.print_job_key),
    ) {
        (Some(t), Some(l), Some(p)) => (t, l, p),
        _ => {
            warn!("missing required fields in request");
            return Err(ApiError::MissingFields);
        }
    };

    let pipeline = &state.pipeline;
    let report_id = non_empty(&request.report_key).unwrap_or(trace_id);
    let pdf = pipeline
        .renderer
        .render(&RenderJob {
            layout_name,
            report_id,
            trace_id,
            data: &request.data,
        })
        .await
        .map_err(ApiError::Render)?;

    let mut upload = UploadRequest::new(pdf, trace_id, print_job_key);
    if let Some(data_key) = request.data_key.as_deref().filter(|k| !k.trim().is_empty()) {
        upload = upload.with_result_key(data_key);
    }
    let cancel = state.shutdown.child_token();
    let receipt = pipeline.deliver(&upload, &cancel).await.inspect_err(|e| {
        error!(trace_id, failure = e.kind(), "report generation failed: {}", e);
    })?;

    let processing_time = start.elapsed().as_millis() as u64;
    info!(trace_id, layout_name, processing_time_ms = processing_time, "report generation completed");

    Ok(Json(json!({
        "success": true,
        "message": "Report generated and uploaded successfully",
        "traceId": trace_id,
        "layoutName": layout_name,
        "lobId": receipt.handle_id,
        "processingTime": processing_time,
    })))
}

/// GET /api/reports/status
pub async fn report_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "service": SERVICE_NAME,
        "status": "operational",
        "crystalServer": state.pipeline.renderer.server_url(),
        "ifsCloud": &*state.platform_url,
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// IFS sends some keys as numbers; keep them as their textual form.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
