//! Filer Core Application Logic
//!
//! This crate contains:
//! - Configuration
//! - Error types
//! - Filesystem backend selection

pub mod config;
pub mod error;

pub use config::{DeploymentMode, FilerConfig, FsConfig, GeneralConfig};
pub use error::AppError;

use app_fs::{AutoApprove, Bridge, Confirm, FakeFs, Fs, NativeFs};
use std::sync::Arc;

/// Build the filesystem facade for the configured deployment mode.
///
/// `confirm` is replaced by [`AutoApprove`] when confirmations are disabled.
/// Must be called inside a tokio runtime.
pub fn select_backend(config: &FilerConfig, confirm: Arc<dyn Confirm>) -> Fs {
    let confirm: Arc<dyn Confirm> = if config.fs.confirm_operations {
        confirm
    } else {
        Arc::new(AutoApprove)
    };

    match config.general.mode {
        DeploymentMode::Production => {
            tracing::info!("Using native filesystem");
            let native = NativeFs::new(confirm, Bridge::local(), config.fs.read_limits())
                .with_watch_debounce(config.fs.watch_debounce());
            Fs::new(Arc::new(native))
        }
        DeploymentMode::Development => {
            tracing::info!("Using in-memory filesystem");
            Fs::new(Arc::new(FakeFs::new(confirm)))
        }
    }
}
