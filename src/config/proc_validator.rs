//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks:
//!   * server / logging / metrics / retry invariants
//!   * upstream URLs (identity endpoint, IFS Cloud, Crystal server) are absolute http(s)
//!   * service account credentials are present
//!   * layout mapping targets are `.rpt` files

use reqwest::Url;
use tracing::{error, info};

use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::config::upstreams::{PlatformConfig, RendererConfig, ServiceConfig, ServiceCredential};
use crate::observability::metrics::get_metrics;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_identity(&cfg.identity, &mut errors);
    validate_platform(&cfg.platform, &mut errors);
    validate_renderer(&cfg.renderer, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(retry) = &settings.retry {
        validate_retry("settings.retry", retry, errors);
    }

    if settings.server.host.is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' must be an integer in range 0-65535",
            settings.server.port
        ));
    }

    if settings.request_timeout_ms == 0 {
        errors.push("settings.request_timeout_ms must be > 0".to_string());
    }

    // metrics endpoint start with '/'
    let metrics = &settings.metrics;
    if !metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            metrics.path
        ));
    }

    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_retry(path: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if let Some(attempts) = retry.attempts {
        if attempts == 0 {
            errors.push(format!("{}.attempts must be > 0", path));
        }
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
                path, max, base
            ));
        }
    }
}

/// IFS IAM
fn validate_identity(identity: &ServiceCredential, errors: &mut Vec<String>) {
    validate_url("identity.endpoint", &identity.endpoint, errors);
    for (field, value) in [
        ("client_id", &identity.client_id),
        ("client_secret", &identity.client_secret),
        ("username", &identity.username),
        ("password", &identity.password),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("identity.{} cannot be empty", field));
        }
    }
}

/// IFS CLOUD
fn validate_platform(platform: &PlatformConfig, errors: &mut Vec<String>) {
    validate_url("platform.base_url", &platform.base_url, errors);
    if !platform.upload_base.is_empty() && !platform.upload_base.starts_with('/') {
        errors.push(format!(
            "platform.upload_base '{}' must start with '/'",
            platform.upload_base
        ));
    }
}

/// CRYSTAL REPORTS
fn validate_renderer(renderer: &RendererConfig, errors: &mut Vec<String>) {
    validate_url("renderer.server_url", &renderer.server_url, errors);
    if !renderer.reports_path.is_empty() && !renderer.reports_path.starts_with('/') {
        errors.push(format!(
            "renderer.reports_path '{}' must start with '/'",
            renderer.reports_path
        ));
    }
    if renderer.timeout_ms == 0 {
        errors.push("renderer.timeout_ms must be > 0".to_string());
    }
    for (layout, report) in &renderer.layouts {
        if !report.to_lowercase().ends_with(".rpt") {
            errors.push(format!(
                "renderer.layouts.{}: '{}' must name a .rpt file",
                layout, report
            ));
        }
    }
}

fn validate_url(path: &str, value: &str, errors: &mut Vec<String>) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(format!(
            "{}: unsupported scheme '{}', expected http or https",
            path,
            url.scheme()
        )),
        Err(e) => errors.push(format!("{}: '{}' is not a valid URL: {}", path, value, e)),
    }
}
