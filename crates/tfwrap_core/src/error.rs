//! Error types for wrapper generation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for wrapper operations.
pub type WrapResult<T> = Result<T, WrapError>;

/// Errors that can occur while generating a wrapper module.
#[derive(Error, Debug)]
pub enum WrapError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Module fetch failed: {0}")]
    Fetch(String),

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },

    #[error("Formatting failed: {0}")]
    Format(String),

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("Runner error: {0}")]
    Runner(#[from] tfwrap_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Coarse classification of a [`WrapError`], used for exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Fetch,
    Parse,
    Write,
    Format,
    Settings,
    Internal,
}

impl WrapError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WrapError::Input(_) => ErrorKind::Input,
            WrapError::Fetch(_) | WrapError::Runner(_) => ErrorKind::Fetch,
            WrapError::Parse { .. } => ErrorKind::Parse,
            WrapError::Write { .. } => ErrorKind::Write,
            WrapError::Format(_) => ErrorKind::Format,
            WrapError::Settings(_) | WrapError::Yaml(_) => ErrorKind::Settings,
            WrapError::Io(_) => ErrorKind::Internal,
        }
    }
}
