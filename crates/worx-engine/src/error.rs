use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a [`crate::GenerationApi`] transport.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service could not find the entity addressed by the key; treated as
    /// an invalid or expired key.
    #[error("requested entity was not found: {0}")]
    EntityNotFound(String),
    #[error("generation service returned {status}: {message}")]
    Service { status: u16, message: String },
    #[error("generation request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API key is missing. Configure one in settings.")]
    MissingKey,
    #[error("The selected API key is invalid or has expired. Please re-select it in settings.")]
    InvalidKey,
    #[error("Generation failed: no image part in response.")]
    NoImage,
    #[error("{0}")]
    Transport(String),
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingKey => "missing_key",
            Self::InvalidKey => "invalid_key",
            Self::NoImage => "no_image",
            Self::Transport(_) => "transport",
            Self::Read { .. } => "read",
        }
    }
}

impl From<ApiError> for GenerationError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::EntityNotFound(_) => Self::InvalidKey,
            other => Self::Transport(other.to_string()),
        }
    }
}
