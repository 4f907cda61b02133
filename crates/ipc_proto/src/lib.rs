//! IPC Protocol definitions for the privileged-operation channel
//!
//! Trash, compression and extraction are not performed by the filesystem
//! backends themselves. They are sent as one-way requests to a privileged
//! host, which answers with events correlated by request id.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Archive formats the host can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionFormat {
    Zip,
    TarGz,
}

impl CompressionFormat {
    /// File extension appended to generated archive names
    pub fn extension(&self) -> &'static str {
        match self {
            CompressionFormat::Zip => "zip",
            CompressionFormat::TarGz => "tgz",
        }
    }

    /// Parse a user-facing format name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "zip" => Some(CompressionFormat::Zip),
            "tgz" | "tar.gz" | "targz" => Some(CompressionFormat::TarGz),
            _ => None,
        }
    }
}

/// Requests sent from the filesystem layer to the privileged host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivilegedRequest {
    /// Move an item to the system trash (no reply)
    Trash { path: String },

    /// Pack `sources` into a new archive at `destination`
    Compress {
        id: Uuid,
        format: CompressionFormat,
        sources: Vec<String>,
        destination: String,
    },

    /// Unpack `source` into the new folder `destination`
    Extract {
        id: Uuid,
        source: String,
        destination: String,
    },

    /// Stop a running request; the host stays silent about it afterwards
    Cancel { id: Uuid },
}

/// Events sent back from the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegedEvent {
    pub id: Uuid,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Percentage in 0..=100, zero or more times
    Progress(u8),

    /// Terminal: finished successfully
    End,

    /// Terminal: failed. Message starts with an errno-style code when known
    /// (e.g. `ENOENT: ...`).
    Error(String),
}

impl EventKind {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::End | EventKind::Error(_))
    }
}

impl PrivilegedEvent {
    pub fn progress(id: Uuid, percent: u8) -> Self {
        Self {
            id,
            kind: EventKind::Progress(percent.min(100)),
        }
    }

    pub fn end(id: Uuid) -> Self {
        Self { id, kind: EventKind::End }
    }

    pub fn error(id: Uuid, message: impl Into<String>) -> Self {
        Self {
            id,
            kind: EventKind::Error(message.into()),
        }
    }
}

/// Framing errors
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("Failed to encode frame: {0}")]
    Encode(String),

    #[error("Failed to decode frame: {0}")]
    Decode(String),
}

/// Encode a message into a bincode frame
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtoError> {
    bincode::serialize(message).map_err(|e| ProtoError::Encode(e.to_string()))
}

/// Decode a bincode frame
pub fn decode<'a, T: Deserialize<'a>>(frame: &'a [u8]) -> Result<T, ProtoError> {
    bincode::deserialize(frame).map_err(|e| ProtoError::Decode(e.to_string()))
}

/// Generate a request correlation id
pub fn request_id() -> Uuid {
    Uuid::new_v4()
}
