//! ItemPath - platform-neutral path model
//!
//! A path is an optional drive letter, an ordered list of segment names and a
//! folder flag. Its canonical string form is `[D:]/seg1/seg2[/]`, with the
//! trailing slash present iff the path is a non-root folder.

use crate::{FileItemIdentifier, FolderItemIdentifier, ItemIdentifier, PathError};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Suffix stacked onto duplicated item names
pub const DUPLICATE_SUFFIX: &str = "_copy";

/// Host platform family, decides the root drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemPath {
    drive_letter: Option<char>,
    hierarchy: Vec<String>,
    is_folder: bool,
}

impl ItemPath {
    /// Build a path from its parts without validation
    pub fn new(drive_letter: Option<char>, hierarchy: Vec<String>, is_folder: bool) -> Self {
        Self {
            drive_letter: drive_letter.map(|c| c.to_ascii_uppercase()),
            hierarchy,
            is_folder,
        }
    }

    /// Parse a raw path string.
    ///
    /// Accepts an optional `<letter>:` prefix and both `/` and `\` as
    /// separators. Empty segments are dropped; this never fails.
    pub fn parse(raw: &str, is_folder: bool) -> Self {
        let mut chars = raw.chars();
        let (drive_letter, rest) = match (chars.next(), chars.next()) {
            (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => {
                (Some(letter.to_ascii_uppercase()), &raw[2..])
            }
            _ => (None, raw),
        };

        let hierarchy = rest
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            drive_letter,
            hierarchy,
            is_folder,
        }
    }

    /// Build from a native path
    pub fn from_native<P: AsRef<Path>>(path: P, is_folder: bool) -> Self {
        Self::parse(&path.as_ref().to_string_lossy(), is_folder)
    }

    /// Root folder of the given platform
    pub fn root(platform: Platform) -> Self {
        let drive_letter = match platform {
            Platform::Windows => Some('C'),
            Platform::Unix => None,
        };
        Self::new(drive_letter, Vec::new(), true)
    }

    pub fn drive_letter(&self) -> Option<char> {
        self.drive_letter
    }

    pub fn hierarchy(&self) -> &[String] {
        &self.hierarchy
    }

    pub fn is_folder(&self) -> bool {
        self.is_folder
    }

    pub fn is_root(&self) -> bool {
        self.hierarchy.is_empty()
    }

    /// True if `self` lies strictly below `ancestor`
    pub fn is_descendant_of(&self, ancestor: &ItemPath) -> bool {
        self.drive_letter == ancestor.drive_letter
            && self.hierarchy.len() > ancestor.hierarchy.len()
            && self.hierarchy.starts_with(&ancestor.hierarchy)
    }

    /// Same hierarchy with a different folder flag
    pub fn with_folder_flag(&self, is_folder: bool) -> Self {
        Self {
            is_folder,
            ..self.clone()
        }
    }

    /// Append a child name. The name is validated as a file identifier.
    pub fn append(&self, name: &str, is_folder: bool) -> Result<Self, PathError> {
        if !self.is_folder {
            return Err(PathError::CannotAppendToFilePath(self.clone()));
        }

        let id = FileItemIdentifier::parse(name)?;
        Ok(self.child(id.to_string(), is_folder))
    }

    /// Append a typed identifier; the folder flag comes from its variant
    pub fn append_identifier(&self, id: &ItemIdentifier) -> Result<Self, PathError> {
        if !self.is_folder {
            return Err(PathError::CannotAppendToFilePath(self.clone()));
        }

        Ok(self.child(id.to_string(), id.is_folder()))
    }

    fn child(&self, segment: String, is_folder: bool) -> Self {
        let mut hierarchy = self.hierarchy.clone();
        hierarchy.push(segment);
        Self {
            drive_letter: self.drive_letter,
            hierarchy,
            is_folder,
        }
    }

    pub fn parent(&self) -> Result<Self, PathError> {
        self.parent_n(1)
    }

    /// Walk `count` levels up. The result is always a folder path.
    pub fn parent_n(&self, count: usize) -> Result<Self, PathError> {
        if count > self.hierarchy.len() {
            return Err(PathError::HierarchyCountIsOutOfBounds {
                path: self.clone(),
                count,
            });
        }

        let end = self.hierarchy.len() - count;
        Ok(Self {
            drive_letter: self.drive_letter,
            hierarchy: self.hierarchy[..end].to_vec(),
            is_folder: true,
        })
    }

    /// Canonical string form
    pub fn full_path(&self) -> String {
        let mut path = String::new();

        if let Some(letter) = self.drive_letter {
            path.push(letter);
            path.push(':');
        }

        path.push('/');
        path.push_str(&self.hierarchy.join("/"));

        if self.is_folder && !self.hierarchy.is_empty() {
            path.push('/');
        }

        path
    }

    /// Raw last segment, `None` for the root
    pub fn name(&self) -> Option<&str> {
        self.hierarchy.last().map(String::as_str)
    }

    /// Identifier of the last segment, `None` for the root
    pub fn identifier(&self) -> Result<Option<ItemIdentifier>, PathError> {
        self.name()
            .map(|name| ItemIdentifier::parse(name, self.is_folder))
            .transpose()
    }

    pub fn is_extractable(&self) -> bool {
        !self.is_folder
            && matches!(self.identifier(), Ok(Some(id)) if id.is_compressed())
    }

    /// Sibling path with `_copy` added to the name, before the extension for files
    pub fn duplicate(&self) -> Result<Self, PathError> {
        self.with_name_suffix(DUPLICATE_SUFFIX)
    }

    /// Sibling path with `_<n>` added to the name, before the extension for files
    pub fn differentiate(&self, n: usize) -> Result<Self, PathError> {
        self.with_name_suffix(&format!("_{n}"))
    }

    fn with_name_suffix(&self, suffix: &str) -> Result<Self, PathError> {
        let id = self
            .identifier()?
            .ok_or_else(|| PathError::CannotProcessTheRootFolder(self.clone()))?;

        let renamed = match id {
            ItemIdentifier::File(file) => {
                ItemIdentifier::File(file.with_name(format!("{}{suffix}", file.name()))?)
            }
            ItemIdentifier::Folder(folder) => {
                ItemIdentifier::Folder(FolderItemIdentifier::new(&format!("{folder}{suffix}"))?)
            }
        };

        self.parent()?.append_identifier(&renamed)
    }

    /// Path for OS calls
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(self.full_path())
    }
}

impl PartialEq for ItemPath {
    fn eq(&self, other: &Self) -> bool {
        self.full_path() == other.full_path()
    }
}

impl Eq for ItemPath {}

impl Hash for ItemPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_path().hash(state);
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}
