use std::path::PathBuf;

use thiserror::Error;

/// Main error type for hook discovery operations
#[derive(Error, Debug)]
pub enum HookError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source could not be parsed into a syntax tree
    #[error("Parse error: {0}")]
    Parse(String),

    /// Scan root does not exist or is not a directory
    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Live mode error: {0}")]
    LiveMode(String),
}

pub type Result<T> = std::result::Result<T, HookError>;
