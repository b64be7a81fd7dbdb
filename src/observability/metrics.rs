use prometheus::{
    Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token metrics
    pub token_acquisitions: IntCounter,
    pub token_acquisition_failures: IntCounter,
    pub token_cache_hits: IntCounter,
    pub token_expiry_unix: IntGauge,

    // Upload metrics
    pub uploads: IntCounterVec,
    pub upload_failures: IntCounterVec,
    pub upload_step_duration: HistogramVec,
    pub uploaded_bytes: IntCounter,

    // Renderer metrics
    pub renders: IntCounterVec,
    pub render_duration: HistogramVec,

    // Request metrics
    pub report_requests: IntCounterVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,

    // Service resource metrics
    pub process_cpu_usage: Gauge,
    pub process_memory_usage: IntGauge,
    pub process_start_time: IntGauge,
    pub process_uptime: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("reportforge".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token
            token_acquisitions: IntCounter::new("token_acquisitions_total", "Tokens obtained from the identity endpoint").unwrap(),
            token_acquisition_failures: IntCounter::new("token_acquisition_failures_total", "Rejected or failed credential exchanges").unwrap(),
            token_cache_hits: IntCounter::new("token_cache_hits_total", "Token requests served from cache").unwrap(),
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry of the cached token").unwrap(),

            // Upload
            uploads: IntCounterVec::new(Opts::new("uploads_total", "Upload flows by outcome"), &["outcome"]).unwrap(),
            upload_failures: IntCounterVec::new(Opts::new("upload_failures_total", "Upload failures by classification"), &["kind", "step"]).unwrap(),
            upload_step_duration: HistogramVec::new(HistogramOpts::new("upload_step_duration_seconds", "Duration of each upload step").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]), &["step"]).unwrap(),
            uploaded_bytes: IntCounter::new("uploaded_bytes_total", "Artifact bytes written to temporary lobs").unwrap(),

            // Renderer
            renders: IntCounterVec::new(Opts::new("renders_total", "Render calls by outcome"), &["outcome"]).unwrap(),
            render_duration: HistogramVec::new(HistogramOpts::new("render_duration_seconds", "Crystal Reports render duration").buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]), &["report"]).unwrap(),

            // Requests
            report_requests: IntCounterVec::new(Opts::new("report_requests_total", "Report requests by HTTP status"), &["status"]).unwrap(),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),
            process_cpu_usage: Gauge::new("process_cpu_usage_percent", "CPU usage % of this process").unwrap(),
            process_memory_usage: IntGauge::new("process_memory_usage_bytes", "Resident memory used by this process").unwrap(),
            process_start_time: IntGauge::new("process_start_time_seconds", "Process start time (UNIX seconds)").unwrap(),
            process_uptime: IntGauge::new("process_uptime_seconds", "Process uptime seconds").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_acquisitions.clone())).unwrap();
        reg.register(Box::new(metrics.token_acquisition_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.uploads.clone())).unwrap();
        reg.register(Box::new(metrics.upload_failures.clone())).unwrap();
        reg.register(Box::new(metrics.upload_step_duration.clone())).unwrap();
        reg.register(Box::new(metrics.uploaded_bytes.clone())).unwrap();
        reg.register(Box::new(metrics.renders.clone())).unwrap();
        reg.register(Box::new(metrics.render_duration.clone())).unwrap();
        reg.register(Box::new(metrics.report_requests.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        reg.register(Box::new(metrics.process_cpu_usage.clone())).unwrap();
        reg.register(Box::new(metrics.process_memory_usage.clone())).unwrap();
        reg.register(Box::new(metrics.process_start_time.clone())).unwrap();
        reg.register(Box::new(metrics.process_uptime.clone())).unwrap();

        metrics
    }
}
