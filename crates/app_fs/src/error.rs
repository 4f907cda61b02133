//! Error taxonomy for the path model and filesystem backends

use crate::ItemPath;
use std::fmt;
use std::io;
use thiserror::Error;

/// Stable classification of filesystem and path failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsErrorKind {
    NotExists,
    AlreadyExists,
    NotADirectory,
    NotAFile,
    BusyOrLocked,
    OperationNotPermitted,
    CannotProcessTheRootFolder,
    ItemIsNotExtractable,
    NoPathProvided,
    HierarchyCountIsOutOfBounds,
    CannotAppendToFilePath,
    EmptyIdentifier,
    IncludesIllegalCharacter,
}

/// errno-style message prefixes and the kind each one maps to
const MESSAGE_PREFIXES: &[(&str, FsErrorKind)] = &[
    ("EBUSY:", FsErrorKind::BusyOrLocked),
    ("EEXIST:", FsErrorKind::AlreadyExists),
    ("ENOENT:", FsErrorKind::NotExists),
    ("EPERM:", FsErrorKind::OperationNotPermitted),
    ("EACCES:", FsErrorKind::OperationNotPermitted),
    ("EISDIR:", FsErrorKind::NotAFile),
    ("ENOTDIR:", FsErrorKind::NotADirectory),
];

impl FsErrorKind {
    /// Classify a raw error message by its errno prefix.
    ///
    /// Returns `None` for anything unrecognized; classification is best-effort.
    pub fn from_message(message: &str) -> Option<Self> {
        MESSAGE_PREFIXES
            .iter()
            .find(|(prefix, _)| message.starts_with(prefix))
            .map(|(_, kind)| *kind)
    }

    /// Classify an OS error
    pub fn from_io(err: &io::Error) -> Option<Self> {
        match err.kind() {
            io::ErrorKind::NotFound => Some(FsErrorKind::NotExists),
            io::ErrorKind::AlreadyExists => Some(FsErrorKind::AlreadyExists),
            io::ErrorKind::PermissionDenied => Some(FsErrorKind::OperationNotPermitted),
            io::ErrorKind::ResourceBusy => Some(FsErrorKind::BusyOrLocked),
            io::ErrorKind::IsADirectory => Some(FsErrorKind::NotAFile),
            io::ErrorKind::NotADirectory => Some(FsErrorKind::NotADirectory),
            _ => None,
        }
    }

    /// errno-style prefix used on the privileged channel, if this kind has one
    pub fn wire_prefix(&self) -> Option<&'static str> {
        MESSAGE_PREFIXES
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(prefix, _)| *prefix)
    }

    pub fn message(&self) -> &'static str {
        match self {
            FsErrorKind::NotExists => "Item not exists.",
            FsErrorKind::AlreadyExists => "Item already exists.",
            FsErrorKind::NotADirectory => "Item is not a directory.",
            FsErrorKind::NotAFile => "Item is not a file.",
            FsErrorKind::BusyOrLocked => "Item is busy or locked.",
            FsErrorKind::OperationNotPermitted => "Operation not permitted.",
            FsErrorKind::CannotProcessTheRootFolder => "Cannot process the root folder.",
            FsErrorKind::ItemIsNotExtractable => "Item is not extractable.",
            FsErrorKind::NoPathProvided => "No path provided.",
            FsErrorKind::HierarchyCountIsOutOfBounds => "Hierarchy count is out of bounds.",
            FsErrorKind::CannotAppendToFilePath => "Cannot append to file path.",
            FsErrorKind::EmptyIdentifier => "Empty string specified as item identifier.",
            FsErrorKind::IncludesIllegalCharacter => "Item identifier includes illegal character.",
        }
    }
}

impl fmt::Display for FsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Synchronous errors raised while building identifiers and paths
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Empty string specified as item identifier.")]
    EmptyIdentifier,

    #[error("Item identifier includes illegal character: {0:?}")]
    IncludesIllegalCharacter(String),

    #[error("Cannot append to file path: {0}")]
    CannotAppendToFilePath(ItemPath),

    #[error("Hierarchy count {count} is out of bounds: {path}")]
    HierarchyCountIsOutOfBounds { path: ItemPath, count: usize },

    #[error("Cannot process the root folder: {0}")]
    CannotProcessTheRootFolder(ItemPath),
}

impl PathError {
    pub fn kind(&self) -> FsErrorKind {
        match self {
            PathError::EmptyIdentifier => FsErrorKind::EmptyIdentifier,
            PathError::IncludesIllegalCharacter(_) => FsErrorKind::IncludesIllegalCharacter,
            PathError::CannotAppendToFilePath(_) => FsErrorKind::CannotAppendToFilePath,
            PathError::HierarchyCountIsOutOfBounds { .. } => FsErrorKind::HierarchyCountIsOutOfBounds,
            PathError::CannotProcessTheRootFolder(_) => FsErrorKind::CannotProcessTheRootFolder,
        }
    }

    pub fn path(&self) -> Option<&ItemPath> {
        match self {
            PathError::EmptyIdentifier | PathError::IncludesIllegalCharacter(_) => None,
            PathError::CannotAppendToFilePath(path)
            | PathError::HierarchyCountIsOutOfBounds { path, .. }
            | PathError::CannotProcessTheRootFolder(path) => Some(path),
        }
    }
}

/// File system errors
#[derive(Debug, Error)]
pub enum FsError {
    #[error("{kind}{suffix}", suffix = path_suffix(.path))]
    Classified {
        kind: FsErrorKind,
        path: Option<ItemPath>,
    },

    /// OS error that matched no known kind
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Channel error message that matched no known prefix
    #[error("{0}")]
    Unclassified(String),

    #[error("Operation declined: {0}")]
    Declined(ItemPath),

    #[error("Not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Privileged channel error: {0}")]
    Channel(String),
}

impl FsError {
    pub fn new(kind: FsErrorKind, path: Option<ItemPath>) -> Self {
        FsError::Classified { kind, path }
    }

    pub fn at(kind: FsErrorKind, path: &ItemPath) -> Self {
        FsError::Classified {
            kind,
            path: Some(path.clone()),
        }
    }

    /// Classify an OS error, passing it through untouched when unrecognized
    pub fn from_io(err: io::Error, path: &ItemPath) -> Self {
        match FsErrorKind::from_io(&err) {
            Some(kind) => FsError::at(kind, path),
            None => FsError::Io(err),
        }
    }

    /// Classify an error message received from the privileged host
    pub fn from_message(message: impl Into<String>, path: Option<&ItemPath>) -> Self {
        let message = message.into();
        match FsErrorKind::from_message(&message) {
            Some(kind) => FsError::new(kind, path.cloned()),
            None => FsError::Unclassified(message),
        }
    }

    /// The classified kind, `None` for residual unknown errors
    pub fn kind(&self) -> Option<FsErrorKind> {
        match self {
            FsError::Classified { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&ItemPath> {
        match self {
            FsError::Classified { path, .. } => path.as_ref(),
            FsError::Declined(path) => Some(path),
            _ => None,
        }
    }
}

fn path_suffix(path: &Option<ItemPath>) -> String {
    path.as_ref().map(|p| format!(" ({p})")).unwrap_or_default()
}

impl From<PathError> for FsError {
    fn from(e: PathError) -> Self {
        let path = e.path().cloned();
        FsError::Classified { kind: e.kind(), path }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
