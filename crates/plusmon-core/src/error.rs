use thiserror::Error;

/// Domain-level error type for the connector layer.
///
/// Device-facing failures bubble up from [`plusmon_api::Error`]
/// unchanged; this adds the conditions only the orchestration layer
/// can detect.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Error from the device-facing layer (detection, auth, transport,
    /// parsing).
    #[error(transparent)]
    Api(#[from] plusmon_api::Error),

    /// Caller-supplied port or state value is invalid for this model.
    #[error("Invalid control argument: {message}")]
    InvalidControlArgument { message: String },

    /// Operation not supported by the detected model.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Token cache I/O failure.
    #[error("Token cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Token cache (de)serialization failure.
    #[error("Token cache format error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns `true` if polling should stop rather than retry on the
    /// next cycle.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Api(e) => e.is_auth_failure() || e.is_detection_failure(),
            Self::InvalidControlArgument { .. } | Self::UnsupportedOperation(_) => true,
            Self::Io(_) | Self::Json(_) => false,
        }
    }
}
