use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use bytes::Bytes;
use http::header::ACCEPT;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::config::upstreams::RendererConfig;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;

/// Payload fields forwarded to Crystal as report parameters: (payload key, parameter name).
const PARAMETER_FIELDS: [(&str, &str); 5] = [
    ("invoiceNumber", "InvoiceNumber"),
    ("orderNumber", "OrderNumber"),
    ("customerNumber", "CustomerNumber"),
    ("fromDate", "FromDate"),
    ("toDate", "ToDate"),
];

/// What to render.
#[derive(Debug, Clone)]
pub struct RenderJob<'a> {
    /// IFS `.irg` layout name
    pub layout_name: &'a str,
    pub report_id: &'a str,
    pub trace_id: &'a str,
    /// full request payload; parameters are picked from it
    pub data: &'a Map<String, Value>,
}

/// Client of the Crystal Reports Server. Rendering itself is opaque to this service.
#[derive(Debug, Clone)]
pub struct CrystalRenderer {
    client: Client,
    config: RendererConfig,
}

impl CrystalRenderer {
    pub fn new(client: Client, config: RendererConfig) -> Self {
        Self { client, config }
    }

    pub fn server_url(&self) -> &str {
        &self.config.server_url
    }

    /// Maps an IFS layout name to the Crystal `.rpt` file.
    pub fn map_layout_to_report(&self, layout_name: &str) -> String {
        let base_name = layout_name.strip_suffix(".irg").unwrap_or(layout_name);
        self.config
            .layouts
            .get(&base_name.to_lowercase())
            .cloned()
            .unwrap_or_else(|| format!("{}.rpt", base_name))
    }

    pub async fn render(&self, job: &RenderJob<'_>) -> Result<Bytes> {
        let report = self.map_layout_to_report(job.layout_name);
        info!(
            layout_name = job.layout_name,
            report_id = job.report_id,
            trace_id = job.trace_id,
            "generating Crystal report {}",
            report
        );

        let metrics = get_metrics().await;
        let start = get_instant();
        let result = self.fetch_pdf(&report, job).await;
        metrics
            .render_duration
            .with_label_values(&[report.as_str()])
            .observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(pdf) => {
                metrics.renders.with_label_values(&["ok"]).inc();
                info!(
                    trace_id = job.trace_id,
                    "Crystal report generated, {:.2} KB",
                    pdf.len() as f64 / 1024.0
                );
            }
            Err(e) => {
                metrics.renders.with_label_values(&["error"]).inc();
                error!(
                    layout_name = job.layout_name,
                    report_id = job.report_id,
                    trace_id = job.trace_id,
                    "error generating Crystal report: {}",
                    e
                );
            }
        }
        result.map_err(|e| anyhow!("Crystal Reports generation failed: {}", e))
    }

    async fn fetch_pdf(&self, report: &str, job: &RenderJob<'_>) -> Result<Bytes> {
        let url = format!(
            "{}{}/{}",
            self.config.server_url.trim_end_matches('/'),
            self.config.reports_path.trim_end_matches('/'),
            report
        );
        let mut query: Vec<(String, String)> = extract_parameters(job.data).into_iter().collect();
        query.sort();
        query.push(("output".to_owned(), "pdf".to_owned()));

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(ACCEPT, "application/pdf")
            .query(&query)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("render server returned {}", status));
        }
        let pdf = response.bytes().await?;
        if pdf.is_empty() {
            return Err(anyhow!("render server returned an empty document"));
        }
        Ok(pdf)
    }
}

/// Picks the report parameters Crystal understands out of the IFS payload.
pub fn extract_parameters(data: &Map<String, Value>) -> HashMap<String, String> {
    PARAMETER_FIELDS
        .iter()
        .filter_map(|(field, parameter)| {
            let value = match data.get(*field)? {
                Value::String(s) if !s.is_empty() => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some(((*parameter).to_owned(), value))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn renderer() -> CrystalRenderer {
        CrystalRenderer::new(
            Client::new(),
            RendererConfig {
                server_url: "http://crystal".to_owned(),
                reports_path: "/reports".to_owned(),
                username: "u".to_owned(),
                password: "p".to_owned(),
                timeout_ms: 1000,
                layouts: HashMap::from([("invoice".to_owned(), "CustomerInvoice.rpt".to_owned())]),
            },
        )
    }

    #[test]
    fn maps_known_and_unknown_layouts() {
        let renderer = renderer();
        assert_eq!(renderer.map_layout_to_report("Invoice.irg"), "CustomerInvoice.rpt");
        assert_eq!(renderer.map_layout_to_report("invoice"), "CustomerInvoice.rpt");
        assert_eq!(renderer.map_layout_to_report("StockCount.irg"), "StockCount.rpt");
    }

    #[test]
    fn extracts_only_known_non_empty_parameters() {
        let data = json!({
            "invoiceNumber": "INV-1",
            "orderNumber": "",
            "customerNumber": 42,
            "toDate": null,
            "layoutName": "invoice.irg"
        });
        let params = extract_parameters(data.as_object().unwrap());
        assert_eq!(params.len(), 2);
        assert_eq!(params["InvoiceNumber"], "INV-1");
        assert_eq!(params["CustomerNumber"], "42");
    }
}
