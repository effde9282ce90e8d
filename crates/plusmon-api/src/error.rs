use thiserror::Error;

/// Top-level error type for the `plusmon-api` crate.
///
/// Covers every failure mode across the device-facing surfaces:
/// model detection, authentication, transport, template rendering, and
/// page parsing. `plusmon-core` maps these into domain diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed permanently (bad credentials, or lockout after too
    /// many consecutive soft failures).
    #[error("Login failed: {message}")]
    LoginFailed { message: String },

    /// The device answered HTTP 200 but the body is the login redirect
    /// marker -- the session died without a protocol-level signal.
    /// Internal: consumed by the bounded re-login in the session layer.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Detection ───────────────────────────────────────────────────
    /// No registered model matched the probed login page.
    #[error("Switch model not detected")]
    ModelNotDetected,

    /// More than one registered model matched -- the registry or the
    /// probed page is ill-formed; retrying will not help.
    #[error("Multiple switch models detected: {models}")]
    MultipleModelsDetected { models: String },

    // ── Requests ────────────────────────────────────────────────────
    /// All candidate endpoints for a page were tried and none returned
    /// HTTP 200.
    #[error("Failed to load page: {context}")]
    PageNotLoaded { context: String },

    /// A request template references session or device state that is
    /// unset -- fail fast instead of sending a malformed request.
    #[error("Template parameter `{name}` is unset")]
    EmptyTemplateParameter { name: &'static str },

    // ── Transport ───────────────────────────────────────────────────
    /// Connection-level failure (reset, refused). Timeouts are NOT
    /// errors -- they degrade to an empty response so poll loops
    /// survive.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// HTTP transport error (client build failure, malformed request).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Parsing ─────────────────────────────────────────────────────
    /// A page did not contain an expected field or structure.
    #[error("Parse error: {message}")]
    Parse { message: String },
}

impl Error {
    /// Returns `true` if this error ends the session for good --
    /// polling should stop rather than retry.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::LoginFailed { .. })
    }

    /// Returns `true` for fatal detection outcomes.
    pub fn is_detection_failure(&self) -> bool {
        matches!(
            self,
            Self::ModelNotDetected | Self::MultipleModelsDetected { .. }
        )
    }

    /// Returns `true` if this is a transient condition worth retrying
    /// on the next poll cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::PageNotLoaded { .. } => true,
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
