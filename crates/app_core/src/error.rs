//! Application error types

use app_fs::{FsError, FsErrorKind, PathError};
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Recoverable Errors (notify user, continue) =====
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ===== Fatal Errors (application termination) =====
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Init(String),
}

impl AppError {
    /// Is this error recoverable?
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Fs(_) | AppError::Io(_))
    }

    /// Is this a fatal error?
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Fs(FsError::Declined(_)) => "Cancelled.".to_string(),
            AppError::Fs(FsError::Cancelled) => "Operation cancelled.".to_string(),
            AppError::Fs(e) => match (e.kind(), e.path()) {
                (Some(FsErrorKind::NotExists), Some(path)) => format!("Not found: {}", path),
                (Some(FsErrorKind::AlreadyExists), Some(path)) => {
                    format!("Already exists: {}", path)
                }
                (Some(FsErrorKind::OperationNotPermitted), Some(path)) => {
                    format!("Access denied: {}", path)
                }
                (Some(kind), _) => kind.message().to_string(),
                (None, _) => e.to_string(),
            },
            _ => self.to_string(),
        }
    }
}

impl From<PathError> for AppError {
    fn from(e: PathError) -> Self {
        AppError::Fs(e.into())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::Config(e.to_string())
    }
}
