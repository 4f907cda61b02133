//! Item identifiers - validated file and folder names

use crate::PathError;
use std::fmt;

/// Characters forbidden in identifiers (in addition to control ranges)
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '"', '<', '>', '|', ':', '*', '?'];

/// Raster image extensions
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "ico", "tiff", "tif", "svg",
];

/// Archive extensions
const COMPRESSED_EXTENSIONS: &[&str] = &["zip", "7z", "rar", "tar", "gz", "tgz"];

fn is_illegal_char(c: char) -> bool {
    FORBIDDEN_CHARS.contains(&c)
        || ('\u{0000}'..='\u{001f}').contains(&c)
        || ('\u{007f}'..='\u{009f}').contains(&c)
}

fn validate(value: &str) -> Result<(), PathError> {
    if value.chars().any(is_illegal_char) {
        return Err(PathError::IncludesIllegalCharacter(value.to_string()));
    }
    Ok(())
}

/// Whitespace-free string is empty or made only of dots
fn is_blank(raw: &str) -> bool {
    raw.chars().filter(|c| !c.is_whitespace()).all(|c| c == '.')
}

/// File name split into name and extension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileItemIdentifier {
    name: String,
    extension: String,
}

impl FileItemIdentifier {
    pub fn new(name: impl Into<String>, extension: impl Into<String>) -> Result<Self, PathError> {
        let name = name.into();
        let extension = extension.into();

        if name.is_empty() && extension.is_empty() {
            return Err(PathError::EmptyIdentifier);
        }

        validate(&name)?;
        validate(&extension)?;

        Ok(Self { name, extension })
    }

    /// Parse a raw file name.
    ///
    /// Surrounding whitespace is trimmed and the string is split on its last
    /// dot. A trailing dot stays in the name: `"file.."` has no extension.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if is_blank(raw) {
            return Err(PathError::EmptyIdentifier);
        }

        let trimmed = raw.trim();

        if trimmed.ends_with('.') {
            return Self::new(trimmed, "");
        }

        match trimmed.rfind('.') {
            Some(dot) => Self::new(&trimmed[..dot], &trimmed[dot + 1..]),
            None => Self::new(trimmed, ""),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Same extension, different name
    pub fn with_name(&self, name: impl Into<String>) -> Result<Self, PathError> {
        Self::new(name, self.extension.clone())
    }

    pub fn is_image(&self) -> bool {
        self.extension_in(IMAGE_EXTENSIONS)
    }

    pub fn is_compressed(&self) -> bool {
        self.extension_in(COMPRESSED_EXTENSIONS)
    }

    fn extension_in(&self, set: &[&str]) -> bool {
        let ext = self.extension.to_lowercase();
        set.contains(&ext.as_str())
    }
}

impl fmt::Display for FileItemIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extension.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.name, self.extension)
        }
    }
}

/// Folder name, opaque apart from validation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderItemIdentifier {
    id: String,
}

impl FolderItemIdentifier {
    pub fn new(raw: &str) -> Result<Self, PathError> {
        if is_blank(raw) {
            return Err(PathError::EmptyIdentifier);
        }

        let id = raw.trim();
        validate(id)?;

        Ok(Self { id: id.to_string() })
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for FolderItemIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Identifier of a file or a folder
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemIdentifier {
    File(FileItemIdentifier),
    Folder(FolderItemIdentifier),
}

impl ItemIdentifier {
    pub fn parse(raw: &str, is_folder: bool) -> Result<Self, PathError> {
        if is_folder {
            FolderItemIdentifier::new(raw).map(ItemIdentifier::Folder)
        } else {
            FileItemIdentifier::parse(raw).map(ItemIdentifier::File)
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, ItemIdentifier::Folder(_))
    }

    pub fn as_file(&self) -> Option<&FileItemIdentifier> {
        match self {
            ItemIdentifier::File(id) => Some(id),
            ItemIdentifier::Folder(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.as_file().is_some_and(FileItemIdentifier::is_image)
    }

    pub fn is_compressed(&self) -> bool {
        self.as_file().is_some_and(FileItemIdentifier::is_compressed)
    }
}

impl fmt::Display for ItemIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemIdentifier::File(id) => id.fmt(f),
            ItemIdentifier::Folder(id) => id.fmt(f),
        }
    }
}

impl From<FileItemIdentifier> for ItemIdentifier {
    fn from(id: FileItemIdentifier) -> Self {
        ItemIdentifier::File(id)
    }
}

impl From<FolderItemIdentifier> for ItemIdentifier {
    fn from(id: FolderItemIdentifier) -> Self {
        ItemIdentifier::Folder(id)
    }
}
