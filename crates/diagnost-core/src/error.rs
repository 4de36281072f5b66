//! Error taxonomy shared by the inference core and its callers.

use thiserror::Error;

/// Errors raised while loading or running the classification pipeline.
///
/// Variants follow three lifetimes: `Configuration` only ever surfaces at
/// start-up, `UnsupportedMode`/`InvalidRequest` are the caller's fault and
/// recoverable, `Artifact`/`Model` fail a single prediction.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("model '{0}' is not supported")]
    UnsupportedMode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, InferenceError>;

impl InferenceError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    /// True for errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedMode(_) | Self::InvalidRequest(_))
    }

    /// HTTP-style status for the request layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnsupportedMode(_) | Self::InvalidRequest(_) => 400,
            Self::Artifact(_) => 503,
            Self::Configuration(_) | Self::Model(_) => 500,
        }
    }
}
