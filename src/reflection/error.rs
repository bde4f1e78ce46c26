//! Reflection-specific error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReflectionError {
    #[error("file not supported by the workspace: {0}")]
    UnsupportedFile(String),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReflectionResult<T> = Result<T, ReflectionError>;
