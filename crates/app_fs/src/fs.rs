//! The filesystem contract shared by every backend, plus the
//! backend-independent helpers built on top of it

use crate::{
    FsError, FsErrorKind, Item, ItemIdentifier, ItemPath, ItemStats, OperationHandle,
    ProgressCallback, Result,
};
use async_trait::async_trait;
use ipc_proto::CompressionFormat;
use std::sync::Arc;

/// Invoked after the watched folder changes
pub type WatchCallback = Arc<dyn Fn() + Send + Sync>;

/// Name used when several items are compressed together
pub const MULTI_SOURCE_ARCHIVE_NAME: &str = "compress";

/// Bounded preview of a file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileContent {
    pub chunks: Vec<Vec<u8>>,
    /// More data was left unread
    pub omitted: bool,
}

impl FileContent {
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Any NUL byte marks the content as binary
    pub fn is_binary(&self) -> bool {
        self.chunks.iter().any(|chunk| chunk.contains(&0))
    }

    pub fn to_text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.chunks.concat()).into_owned()
    }
}

/// How much of a file `read_file` may load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    pub chunk_size: usize,
    pub max_chunks: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            max_chunks: 16,
        }
    }
}

/// Backend-agnostic file manager operations.
///
/// Mutating operations ask the injected confirmation port before they
/// commit and fail with [`FsError::Declined`] when refused.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// True if the path exists as either a file or a folder
    fn exists(&self, path: &ItemPath) -> bool;

    async fn get_stats(&self, path: &ItemPath) -> Result<ItemStats>;

    /// Direct children of a folder
    async fn get_children(&self, path: &ItemPath) -> Result<Vec<Item>>;

    /// Create an empty file or folder, depending on the path's folder flag
    async fn create(&self, path: &ItemPath) -> Result<()>;

    async fn read_file(&self, path: &ItemPath) -> Result<FileContent>;

    /// Copy a file next to itself under a free `_copy` name
    async fn duplicate(&self, path: &ItemPath) -> Result<ItemPath>;

    async fn rename(&self, from: &ItemPath, to: &ItemPath) -> Result<()>;

    /// Move to the system trash. Fire-and-forget: failures are only logged.
    fn trash(&self, path: &ItemPath);

    async fn compress(
        &self,
        format: CompressionFormat,
        sources: &[ItemPath],
        on_progress: Option<ProgressCallback>,
    ) -> Result<OperationHandle>;

    /// Unpack an archive into a new sibling folder named after it
    async fn extract(
        &self,
        path: &ItemPath,
        on_progress: Option<ProgressCallback>,
    ) -> Result<OperationHandle>;

    /// Watch a folder, replacing any previous watch
    fn watch(&self, path: &ItemPath, callback: WatchCallback) -> Result<()>;
}

/// Apply `duplicate()` until the result does not exist
pub fn get_duplicate_path<F>(fs: &F, path: &ItemPath) -> Result<ItemPath>
where
    F: FileSystem + ?Sized,
{
    let mut candidate = path.duplicate()?;
    while fs.exists(&candidate) {
        candidate = candidate.duplicate()?;
    }
    Ok(candidate)
}

/// `path` itself when free, otherwise the first free `_1`, `_2`, ... sibling
pub fn differentiate_path<F>(fs: &F, path: &ItemPath) -> Result<ItemPath>
where
    F: FileSystem + ?Sized,
{
    if !fs.exists(path) {
        return Ok(path.clone());
    }

    let mut n = 1;
    loop {
        let candidate = path.differentiate(n)?;
        if !fs.exists(&candidate) {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Archive path for `sources`, before collision handling.
///
/// A single source gives a sibling named after it; several sources give
/// `compress.<ext>` in the first source's folder.
pub fn generate_compression_destination_path(
    format: CompressionFormat,
    sources: &[ItemPath],
) -> Result<ItemPath> {
    let first = sources
        .first()
        .ok_or_else(|| FsError::new(FsErrorKind::NoPathProvided, None))?;

    if let Some(root) = sources.iter().find(|path| path.is_root()) {
        return Err(FsError::at(FsErrorKind::CannotProcessTheRootFolder, root));
    }

    let stem = if sources.len() == 1 {
        match first.identifier()? {
            Some(ItemIdentifier::File(file)) if !file.name().is_empty() => file.name().to_string(),
            Some(id) => id.to_string(),
            None => return Err(FsError::at(FsErrorKind::CannotProcessTheRootFolder, first)),
        }
    } else {
        MULTI_SOURCE_ARCHIVE_NAME.to_string()
    };

    let name = format!("{}.{}", stem, format.extension());
    Ok(first.parent()?.append(&name, false)?)
}

/// Folder an archive is extracted into, before collision handling
pub fn generate_extraction_destination_path(path: &ItemPath) -> Result<ItemPath> {
    if path.is_root() {
        return Err(FsError::at(FsErrorKind::CannotProcessTheRootFolder, path));
    }
    if !path.is_extractable() {
        return Err(FsError::at(FsErrorKind::ItemIsNotExtractable, path));
    }

    let stem = match path.identifier()? {
        Some(ItemIdentifier::File(file)) => archive_stem(file.name()).to_string(),
        _ => return Err(FsError::at(FsErrorKind::ItemIsNotExtractable, path)),
    };

    Ok(path.parent()?.append(&stem, true)?)
}

/// `photos.tar` (from `photos.tar.gz`) extracts into `photos`
fn archive_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("tar") && !stem.is_empty() => stem,
        _ => name,
    }
}

/// Front door for callers: wraps the selected backend and adds the
/// backend-independent helpers
#[derive(Clone)]
pub struct Fs {
    backend: Arc<dyn FileSystem>,
}

impl Fs {
    pub fn new(backend: Arc<dyn FileSystem>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn FileSystem> {
        &self.backend
    }

    pub fn exists(&self, path: &ItemPath) -> bool {
        self.backend.exists(path)
    }

    pub async fn get_stats(&self, path: &ItemPath) -> Result<ItemStats> {
        self.backend.get_stats(path).await
    }

    pub async fn get_children(&self, path: &ItemPath) -> Result<Vec<Item>> {
        self.backend.get_children(path).await
    }

    pub async fn create(&self, path: &ItemPath) -> Result<()> {
        self.backend.create(path).await
    }

    pub async fn read_file(&self, path: &ItemPath) -> Result<FileContent> {
        self.backend.read_file(path).await
    }

    pub async fn duplicate(&self, path: &ItemPath) -> Result<ItemPath> {
        self.backend.duplicate(path).await
    }

    pub async fn rename(&self, from: &ItemPath, to: &ItemPath) -> Result<()> {
        self.backend.rename(from, to).await
    }

    pub fn trash(&self, path: &ItemPath) {
        self.backend.trash(path)
    }

    pub async fn compress(
        &self,
        format: CompressionFormat,
        sources: &[ItemPath],
        on_progress: Option<ProgressCallback>,
    ) -> Result<OperationHandle> {
        self.backend.compress(format, sources, on_progress).await
    }

    pub async fn extract(
        &self,
        path: &ItemPath,
        on_progress: Option<ProgressCallback>,
    ) -> Result<OperationHandle> {
        self.backend.extract(path, on_progress).await
    }

    pub fn watch(&self, path: &ItemPath, callback: WatchCallback) -> Result<()> {
        self.backend.watch(path, callback)
    }

    pub fn get_duplicate_path(&self, path: &ItemPath) -> Result<ItemPath> {
        get_duplicate_path(self.backend.as_ref(), path)
    }

    pub fn differentiate_path(&self, path: &ItemPath) -> Result<ItemPath> {
        differentiate_path(self.backend.as_ref(), path)
    }
}
