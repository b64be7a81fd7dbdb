use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

use crate::config::settings::SettingsConfig;
use crate::utils::constants::DEFAULT_RENDER_TIMEOUT_MS;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    pub identity: ServiceCredential,
    pub platform: PlatformConfig,
    pub renderer: RendererConfig,
}

/// ================================
/// IFS IAM service account
/// ================================
/// The one identity this service authenticates as. Loaded at start, never mutated.
#[derive(Deserialize, Clone)]
pub struct ServiceCredential {
    /// token endpoint, e.g. `https://ifs.example.com/auth/realms/x/protocol/openid-connect/token`
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish()
    }
}

/// ================================
/// IFS Cloud
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct PlatformConfig {
    /// e.g. `https://ifs.example.com`
    pub base_url: String,
    /// projection path appended to base_url, e.g. `/main/ifsapplications/projection/v1/ExternalReportsGateway.svc`
    #[serde(default)]
    pub upload_base: String,
}

impl PlatformConfig {
    /// Root every lob and upload call is made against.
    pub fn projection_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.upload_base.trim_end_matches('/')
        )
    }
}

/// ================================
/// Crystal Reports Server
/// ================================
#[derive(Deserialize, Clone)]
pub struct RendererConfig {
    pub server_url: String,
    #[serde(default)]
    pub reports_path: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_render_timeout_ms")]
    pub timeout_ms: u64,
    /// layout base name (lowercase, without `.irg`) -> Crystal `.rpt` file
    #[serde(default = "default_layouts")]
    pub layouts: HashMap<String, String>,
}

impl fmt::Debug for RendererConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererConfig")
            .field("server_url", &self.server_url)
            .field("reports_path", &self.reports_path)
            .field("username", &self.username)
            .field("timeout_ms", &self.timeout_ms)
            .field("layouts", &self.layouts)
            .finish()
    }
}

fn default_render_timeout_ms() -> u64 {
    DEFAULT_RENDER_TIMEOUT_MS
}

fn default_layouts() -> HashMap<String, String> {
    HashMap::from([
        ("invoice".to_owned(), "CustomerInvoice.rpt".to_owned()),
        ("purchase_order".to_owned(), "PurchaseOrder.rpt".to_owned()),
        ("delivery_note".to_owned(), "DeliveryNote.rpt".to_owned()),
    ])
}
