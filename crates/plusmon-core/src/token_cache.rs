// ── On-disk session token cache ──
//
// Lets a caller resume a device session across process restarts
// instead of burning one of the device's few concurrent session slots
// on every start. Not required for correctness: a stale token fails
// the expiry check on first use and the normal re-login takes over.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

/// A persisted session cookie pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub host: String,
    pub name: String,
    pub value: String,
}

/// Write the token to `path` as JSON, replacing any previous content.
pub fn store(path: &Path, token: &CachedToken) -> Result<(), CoreError> {
    let body = serde_json::to_string_pretty(token)?;
    std::fs::write(path, body)?;
    debug!(path = %path.display(), host = %token.host, "session token cached");
    Ok(())
}

/// Read a previously stored token. A missing file is `None`, not an
/// error; a corrupt file is an error.
pub fn load(path: &Path) -> Result<Option<CachedToken>, CoreError> {
    let body = match std::fs::read_to_string(path) {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&body)?))
}
