//! Error types for fingraph

use thiserror::Error;

/// Which model-invoking operation an error came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Resolution,
    Query,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Resolution => "resolution",
            Stage::Query => "query",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{stage}: model unavailable: {message}")]
    ModelUnavailable { stage: Stage, message: String },

    #[error("{stage}: model output invalid: {reason}")]
    ModelOutputInvalid { stage: Stage, reason: String },

    #[error("no knowledge graph has been generated yet")]
    NoGraph,

    #[error("cache i/o error at {path}: {message}")]
    CacheIo { path: String, message: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn model_unavailable(stage: Stage, message: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            stage,
            message: message.into(),
        }
    }

    pub fn output_invalid(stage: Stage, reason: impl Into<String>) -> Self {
        Self::ModelOutputInvalid {
            stage,
            reason: reason.into(),
        }
    }

    pub fn cache_io(path: impl AsRef<std::path::Path>, err: impl std::fmt::Display) -> Self {
        Self::CacheIo {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    pub fn not_configured() -> Self {
        Self::Configuration("model client not initialized (no API key configured)".into())
    }

    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ModelUnavailable { .. } => "model_unavailable",
            Error::ModelOutputInvalid { .. } => "model_output_invalid",
            Error::NoGraph => "no_graph",
            Error::CacheIo { .. } => "cache_io",
            Error::Configuration(_) => "configuration",
            Error::InvalidInput(_) => "invalid_input",
            Error::Json(_) => "json",
            Error::Io(_) => "io",
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::ModelUnavailable { stage, .. } | Error::ModelOutputInvalid { stage, .. } => {
                Some(*stage)
            }
            Error::NoGraph => Some(Stage::Query),
            _ => None,
        }
    }

    pub fn is_no_graph(&self) -> bool {
        matches!(self, Error::NoGraph)
    }
}
