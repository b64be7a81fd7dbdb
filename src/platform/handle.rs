//! Extraction of the temporary lob identifier from a `FndTempLobs` creation response.
//!
//! IFS answers with the entity id in the `OData-EntityId` header, e.g.
//! `https://host/.../FndTempLobs(LobId='1F2E3D4C')`. Some gateways only send
//! `Location`, or echo the entity in the body, so all three are tried in that order.

use std::fmt;
use std::sync::LazyLock;

use http::HeaderMap;
use regex::Regex;
use serde_json::Value;

use crate::error::UploadError;
use crate::utils::constants::ENTITY_ID_HEADER;

static LOB_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"LobId='([^'\s/()]+)'").expect("static regex"));

/// Server-assigned identifier of one temporary lob. Lives for a single upload flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedHandle {
    pub handle_id: String,
}

impl StagedHandle {
    pub fn new(handle_id: impl Into<String>) -> Self {
        Self {
            handle_id: handle_id.into(),
        }
    }
}

impl fmt::Display for StagedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.handle_id)
    }
}

/// Pulls the handle id out of response headers, falling back to the JSON body.
pub fn parse_staged_handle(headers: &HeaderMap, body: &str) -> Result<StagedHandle, UploadError> {
    for name in [ENTITY_ID_HEADER, http::header::LOCATION.as_str()] {
        if let Some(raw) = headers.get(name) {
            let value = raw
                .to_str()
                .map_err(|_| UploadError::staging(format!("{} header is not valid ASCII", name)))?;
            return lob_id_from_entity_id(value)
                .map(StagedHandle::new)
                .ok_or_else(|| UploadError::staging(format!("{} header '{}' carries no LobId", name, value)));
        }
    }

    lob_id_from_body(body)
        .map(StagedHandle::new)
        .ok_or_else(|| UploadError::staging(format!("response carries no {} header and no LobId in body", ENTITY_ID_HEADER)))
}

/// `...FndTempLobs(LobId='abc')` -> `abc`. Exactly one LobId must be present.
pub fn lob_id_from_entity_id(entity_id: &str) -> Option<String> {
    let mut matches = LOB_ID_PATTERN.captures_iter(entity_id);
    let first = matches.next()?.get(1)?.as_str().to_owned();
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}

fn lob_id_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let lob_id = value.get("LobId")?.as_str()?;
    // same shape rules as the header form
    lob_id_from_entity_id(&format!("LobId='{}'", lob_id))
}
