use thiserror::Error;

pub type SceneResult<T> = std::result::Result<T, SceneError>;

/// Errors that can occur while resolving paths or loading scene records.
///
/// Only [`SceneError::MalformedRecord`] and [`SceneError::InvalidRecord`] are
/// hard failures; everything else is recovered locally with a log line
/// (best-effort override application, placeholder nodes for missing
/// templates).
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("path not found: `{0}`")]
    PathNotFound(String),

    #[error("type mismatch at `{path}`: expected {expected}, got {got}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("missing template: {0}")]
    MissingTemplate(String),

    #[error("malformed record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
