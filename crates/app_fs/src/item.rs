//! Items and their stats, as returned by directory listings

use crate::{ItemIdentifier, ItemPath};
use chrono::{DateTime, Datelike, Local};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    File,
    Folder,
}

impl ItemKind {
    pub fn from_folder_flag(is_folder: bool) -> Self {
        if is_folder {
            ItemKind::Folder
        } else {
            ItemKind::File
        }
    }
}

/// Timestamps shared by files and folders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemTimes {
    pub created: DateTime<Local>,
    pub last_accessed: DateTime<Local>,
    pub last_modified: DateTime<Local>,
}

impl ItemTimes {
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            created: now,
            last_accessed: now,
            last_modified: now,
        }
    }

    /// Build from OS timestamps. Birth time is not available everywhere and
    /// falls back to the modification time.
    pub fn from_system(
        created: Option<SystemTime>,
        last_accessed: SystemTime,
        last_modified: SystemTime,
    ) -> Self {
        Self {
            created: created.unwrap_or(last_modified).into(),
            last_accessed: last_accessed.into(),
            last_modified: last_modified.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStats {
    File {
        /// `None` when the OS reports zero bytes
        size: Option<u64>,
        times: ItemTimes,
    },
    Folder {
        times: ItemTimes,
    },
}

impl ItemStats {
    /// File stats; a zero length is reported as unknown size
    pub fn file(len: u64, times: ItemTimes) -> Self {
        ItemStats::File {
            size: (len != 0).then_some(len),
            times,
        }
    }

    pub fn folder(times: ItemTimes) -> Self {
        ItemStats::Folder { times }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ItemStats::File { .. } => ItemKind::File,
            ItemStats::Folder { .. } => ItemKind::Folder,
        }
    }

    pub fn size(&self) -> Option<u64> {
        match self {
            ItemStats::File { size, .. } => *size,
            ItemStats::Folder { .. } => None,
        }
    }

    pub fn times(&self) -> &ItemTimes {
        match self {
            ItemStats::File { times, .. } | ItemStats::Folder { times } => times,
        }
    }

    pub fn created(&self) -> DateTime<Local> {
        self.times().created
    }

    pub fn last_accessed(&self) -> DateTime<Local> {
        self.times().last_accessed
    }

    pub fn last_modified(&self) -> DateTime<Local> {
        self.times().last_modified
    }
}

/// Displayable item properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemProperty {
    Icon,
    Name,
    Size,
    LastModified,
}

/// Read-only view over a path and its stats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    path: ItemPath,
    stats: ItemStats,
}

impl Item {
    pub fn new(path: ItemPath, stats: ItemStats) -> Self {
        Self { path, stats }
    }

    pub fn kind(&self) -> ItemKind {
        self.stats.kind()
    }

    pub fn is_file(&self) -> bool {
        self.kind() == ItemKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind() == ItemKind::Folder
    }

    pub fn path(&self) -> &ItemPath {
        &self.path
    }

    pub fn stats(&self) -> &ItemStats {
        &self.stats
    }

    /// Identifier of the item, `None` for the root or an unparsable name
    pub fn identifier(&self) -> Option<ItemIdentifier> {
        self.path.identifier().ok().flatten()
    }

    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    pub fn drive_letter(&self) -> Option<char> {
        self.path.drive_letter()
    }

    pub fn hierarchy(&self) -> &[String] {
        self.path.hierarchy()
    }

    pub fn full_path(&self) -> String {
        self.path.full_path()
    }

    pub fn property_value(&self, property: ItemProperty) -> String {
        match property {
            ItemProperty::Icon => self.icon_key().to_string(),
            ItemProperty::Name => self
                .identifier()
                .map(|id| id.to_string())
                .or_else(|| self.path.name().map(str::to_string))
                .unwrap_or_default(),
            ItemProperty::Size => match &self.stats {
                ItemStats::File { size: Some(size), .. } => format!("{size}b"),
                ItemStats::File { size: None, .. } => "-b".to_string(),
                ItemStats::Folder { .. } => String::new(),
            },
            ItemProperty::LastModified => {
                let date = self.stats.last_modified();
                format!("{}/{}/{}", date.year(), date.month(), date.day())
            }
        }
    }

    fn icon_key(&self) -> &'static str {
        if self.is_folder() {
            return "folder";
        }

        match self.identifier() {
            Some(id) if id.is_image() => "image",
            Some(id) if id.is_compressed() => "compressed",
            _ => "file",
        }
    }
}
