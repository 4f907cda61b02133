//! Filer File System Abstraction Layer
//!
//! Provides a unified interface for file manager operations, including:
//! - ItemPath / ItemIdentifier: platform-neutral, validated path model
//! - FileSystem: async contract with a native and an in-memory backend
//! - Error classification into a stable FsErrorKind taxonomy
//! - Privileged bridge for trash and archive operations
//! - Single-slot folder watching

mod bridge;
mod confirm;
mod error;
mod fake;
mod fs;
mod host;
mod identifier;
mod item;
mod item_path;
mod native;
mod watcher;

pub use bridge::{operation, Bridge, OperationHandle, OperationSink, PrivilegedTransport, ProgressCallback};
pub use confirm::{AutoApprove, AutoDecline, Confirm};
pub use error::{FsError, FsErrorKind, PathError, Result};
pub use fake::FakeFs;
pub use fs::{
    differentiate_path, generate_compression_destination_path,
    generate_extraction_destination_path, get_duplicate_path, FileContent, FileSystem, Fs,
    ReadLimits, WatchCallback,
};
pub use host::LocalHost;
pub use identifier::{FileItemIdentifier, FolderItemIdentifier, ItemIdentifier};
pub use item::{Item, ItemKind, ItemProperty, ItemStats, ItemTimes};
pub use item_path::{ItemPath, Platform, DUPLICATE_SUFFIX};
pub use native::NativeFs;
pub use watcher::FolderWatcher;

pub use ipc_proto::CompressionFormat;
