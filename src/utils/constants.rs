//! Shared constants and invariants

/// Share of the server-declared token lifetime the cache actually uses.
pub const TOKEN_LIFETIME_PERCENT: u64 = 90;

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 60_000;
pub const HEALTH_PROBE_TIMEOUT_MS: u64 = 5_000;

pub const SERVICE_NAME: &str = "ReportForge";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

// IFS Cloud projection resources
pub const TEMP_LOBS_RESOURCE: &str = "FndTempLobs";
pub const UPLOAD_ACTION: &str = "Upload";
pub const ENTITY_ID_HEADER: &str = "OData-EntityId";
