// tests/common/mod.rs
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;

use crate::config::settings::{
    LogFormat, LoggingConfig, MetricsConfig, RetryConfig, ServerConfig, SettingsConfig,
};
use crate::config::upstreams::{PlatformConfig, RendererConfig, ServiceConfig, ServiceCredential};
use crate::error::UploadError;
use crate::helpers::time::Clock;
use crate::identity::acquirer::{AcquireToken, AcquiredToken};

pub const UPLOAD_BASE: &str = "/main/ifsapplications/projection/v1/ExternalReportsGateway.svc";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    build_reqwest_client_with_timeout(Duration::from_secs(5))
}

pub fn build_reqwest_client_with_timeout(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().expect("reqwest client")
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Acquirer that hands out `token-1`, `token-2`, ... and counts its calls.
#[derive(Clone)]
pub struct FakeAcquirer {
    pub calls: Arc<AtomicUsize>,
    pub failing: Arc<AtomicBool>,
    pub ttl_seconds: u64,
}

impl FakeAcquirer {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(AtomicBool::new(false)),
            ttl_seconds,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl AcquireToken for FakeAcquirer {
    async fn acquire(&self) -> Result<AcquiredToken, UploadError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(UploadError::Auth {
                message: "identity endpoint returned 401 Unauthorized: invalid_grant".to_owned(),
            });
        }
        Ok(AcquiredToken {
            access_token: format!("token-{}", n),
            expires_in_seconds: self.ttl_seconds,
        })
    }
}

pub fn credential(endpoint: &str) -> ServiceCredential {
    ServiceCredential {
        endpoint: endpoint.to_owned(),
        client_id: "report-forge".to_owned(),
        client_secret: "client-s3cret".to_owned(),
        username: "IFSREPORTS".to_owned(),
        password: "svc-pass".to_owned(),
    }
}

pub fn platform(base_url: &str) -> PlatformConfig {
    PlatformConfig {
        base_url: base_url.to_owned(),
        upload_base: UPLOAD_BASE.to_owned(),
    }
}

/// Full config with IAM, IFS and Crystal all served from `base_url`.
pub fn service_config(base_url: &str, api_key: Option<&str>, attempts: u32) -> ServiceConfig {
    ServiceConfig {
        settings: SettingsConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_owned(),
                port: "0".to_owned(),
            },
            logging: Some(LoggingConfig::new("debug".to_owned(), LogFormat::Compact)),
            metrics: MetricsConfig {
                path: "/metrics".to_owned(),
                is_enabled: true,
            },
            retry: Some(RetryConfig {
                attempts: Some(attempts),
                base_delay_ms: Some(10),
                max_delay_ms: Some(20),
            }),
            request_timeout_ms: 2_000,
            api_key: api_key.map(str::to_owned),
        },
        identity: credential(&format!("{}/auth/token", base_url)),
        platform: platform(base_url),
        renderer: RendererConfig {
            server_url: base_url.to_owned(),
            reports_path: "/reports".to_owned(),
            username: "u".to_owned(),
            password: "p".to_owned(),
            timeout_ms: 2_000,
            layouts: HashMap::from([("invoice".to_owned(), "CustomerInvoice.rpt".to_owned())]),
        },
    }
}

pub fn lob_path(lob_id: &str) -> String {
    format!("{}/FndTempLobs(LobId='{}')/BlobData", UPLOAD_BASE, lob_id)
}

pub fn entity_id(base_url: &str, lob_id: &str) -> String {
    format!("{}{}/FndTempLobs(LobId='{}')", base_url, UPLOAD_BASE, lob_id)
}
