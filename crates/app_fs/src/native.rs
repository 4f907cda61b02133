//! Filesystem backend over the real OS

use crate::fs::{
    differentiate_path, generate_compression_destination_path,
    generate_extraction_destination_path, get_duplicate_path,
};
use crate::{
    Bridge, Confirm, FileContent, FileSystem, FolderWatcher, FsError, FsErrorKind, Item,
    ItemPath, ItemStats, ItemTimes, OperationHandle, ProgressCallback, ReadLimits, Result,
    WatchCallback,
};
use async_trait::async_trait;
use futures::future::join_all;
use ipc_proto::{CompressionFormat, PrivilegedRequest};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub struct NativeFs {
    confirm: Arc<dyn Confirm>,
    bridge: Arc<Bridge>,
    limits: ReadLimits,
    watcher: FolderWatcher,
}

impl NativeFs {
    pub fn new(confirm: Arc<dyn Confirm>, bridge: Arc<Bridge>, limits: ReadLimits) -> Self {
        Self {
            confirm,
            bridge,
            limits,
            watcher: FolderWatcher::default(),
        }
    }

    pub fn with_watch_debounce(mut self, debounce: Duration) -> Self {
        self.watcher = FolderWatcher::new(debounce);
        self
    }

    fn confirm(&self, prompt: String, path: &ItemPath) -> Result<()> {
        if self.confirm.confirm(&prompt) {
            Ok(())
        } else {
            tracing::info!("Declined: {}", prompt);
            Err(FsError::Declined(path.clone()))
        }
    }
}

/// OS path without the folder marker, so files and folders probe alike
fn os_path(path: &ItemPath) -> PathBuf {
    path.with_folder_flag(false).to_native()
}

fn os_string(path: &ItemPath) -> String {
    os_path(path).to_string_lossy().into_owned()
}

fn stats_from_metadata(metadata: &std::fs::Metadata) -> ItemStats {
    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let accessed = metadata.accessed().unwrap_or(modified);
    let times = ItemTimes::from_system(metadata.created().ok(), accessed, modified);

    if metadata.is_dir() {
        ItemStats::folder(times)
    } else {
        ItemStats::file(metadata.len(), times)
    }
}

/// Read up to `size` bytes, stopping early only at end of file
async fn read_chunk(file: &mut tokio::fs::File, size: usize) -> io::Result<Vec<u8>> {
    let mut chunk = Vec::with_capacity(size);
    file.take(size as u64).read_to_end(&mut chunk).await?;
    Ok(chunk)
}

#[async_trait]
impl FileSystem for NativeFs {
    fn exists(&self, path: &ItemPath) -> bool {
        os_path(path).try_exists().unwrap_or(false)
    }

    async fn get_stats(&self, path: &ItemPath) -> Result<ItemStats> {
        let metadata = tokio::fs::metadata(os_path(path))
            .await
            .map_err(|e| FsError::from_io(e, path))?;
        Ok(stats_from_metadata(&metadata))
    }

    async fn get_children(&self, path: &ItemPath) -> Result<Vec<Item>> {
        if !path.is_folder() {
            return Err(FsError::at(FsErrorKind::NotADirectory, path));
        }

        let mut dir = tokio::fs::read_dir(os_path(path))
            .await
            .map_err(|e| FsError::from_io(e, path))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| FsError::from_io(e, path))? {
            entries.push(entry);
        }

        let lookups = entries.into_iter().map(|entry| async move {
            let name = entry.file_name().to_string_lossy().into_owned();

            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", entry.path().display(), e);
                    return None;
                }
            };

            match path.append(&name, metadata.is_dir()) {
                Ok(child) => Some(Item::new(child, stats_from_metadata(&metadata))),
                Err(e) => {
                    tracing::warn!("Skipping {:?} in {}: {}", name, path, e);
                    None
                }
            }
        });

        let items: Vec<Item> = join_all(lookups).await.into_iter().flatten().collect();
        tracing::debug!("Listed {} items in {}", items.len(), path);
        Ok(items)
    }

    async fn create(&self, path: &ItemPath) -> Result<()> {
        path.identifier()?;
        if self.exists(path) {
            return Err(FsError::at(FsErrorKind::AlreadyExists, path));
        }

        self.confirm(format!("Create {}?", path), path)?;

        let result = if path.is_folder() {
            tokio::fs::create_dir(os_path(path)).await
        } else {
            tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(os_path(path))
                .await
                .map(drop)
        };
        result.map_err(|e| FsError::from_io(e, path))?;

        tracing::info!("Created: {}", path);
        Ok(())
    }

    async fn read_file(&self, path: &ItemPath) -> Result<FileContent> {
        if path.is_root() {
            return Err(FsError::at(FsErrorKind::CannotProcessTheRootFolder, path));
        }
        if path.is_folder() {
            return Err(FsError::at(FsErrorKind::NotAFile, path));
        }

        let io_err = |e: io::Error| FsError::from_io(e, path);
        let mut file = tokio::fs::File::open(os_path(path)).await.map_err(io_err)?;
        if file.metadata().await.map_err(io_err)?.is_dir() {
            return Err(FsError::at(FsErrorKind::NotAFile, path));
        }

        let mut chunks = Vec::new();
        let mut reached_end = false;

        while chunks.len() < self.limits.max_chunks {
            let chunk = read_chunk(&mut file, self.limits.chunk_size)
                .await
                .map_err(io_err)?;
            let full = chunk.len() == self.limits.chunk_size;

            if !chunk.is_empty() {
                chunks.push(chunk);
            }
            if !full {
                reached_end = true;
                break;
            }
        }

        let omitted = if reached_end {
            false
        } else {
            let mut probe = [0u8; 1];
            file.read(&mut probe).await.map_err(io_err)? > 0
        };

        Ok(FileContent { chunks, omitted })
    }

    async fn duplicate(&self, path: &ItemPath) -> Result<ItemPath> {
        if path.is_root() {
            return Err(FsError::at(FsErrorKind::CannotProcessTheRootFolder, path));
        }
        if path.is_folder() {
            return Err(FsError::Unimplemented("folder duplication"));
        }

        let source_err = |e: io::Error| FsError::from_io(e, path);
        let mut source = tokio::fs::File::open(os_path(path)).await.map_err(source_err)?;
        if source.metadata().await.map_err(source_err)?.is_dir() {
            return Err(FsError::Unimplemented("folder duplication"));
        }

        let target = get_duplicate_path(self, path)?;
        self.confirm(format!("Duplicate {} as {}?", path, target), &target)?;

        let target_err = |e: io::Error| FsError::from_io(e, &target);
        let mut dest = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(os_path(&target))
            .await
            .map_err(target_err)?;

        let copied = match tokio::io::copy(&mut source, &mut dest).await {
            Ok(_) => dest.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = copied {
            drop(dest);
            if let Err(cleanup) = tokio::fs::remove_file(os_path(&target)).await {
                tracing::warn!("Failed to remove partial copy {}: {}", target, cleanup);
            }
            return Err(target_err(e));
        }

        tracing::info!("Duplicated: {} -> {}", path, target);
        Ok(target)
    }

    async fn rename(&self, from: &ItemPath, to: &ItemPath) -> Result<()> {
        if from.is_root() {
            return Err(FsError::at(FsErrorKind::CannotProcessTheRootFolder, from));
        }
        if to.is_root() {
            return Err(FsError::at(FsErrorKind::CannotProcessTheRootFolder, to));
        }
        to.identifier()?;
        if to.is_descendant_of(from) {
            return Err(FsError::at(FsErrorKind::OperationNotPermitted, to));
        }
        if !self.exists(from) {
            return Err(FsError::at(FsErrorKind::NotExists, from));
        }
        if self.exists(to) {
            return Err(FsError::at(FsErrorKind::AlreadyExists, to));
        }

        self.confirm(format!("Rename {} to {}?", from, to), from)?;

        tokio::fs::rename(os_path(from), os_path(to))
            .await
            .map_err(|e| FsError::from_io(e, from))?;

        tracing::info!("Renamed: {} -> {}", from, to);
        Ok(())
    }

    fn trash(&self, path: &ItemPath) {
        if path.is_root() {
            tracing::warn!("Refusing to trash the root folder: {}", path);
            return;
        }

        match self.bridge.send_trash(path) {
            Ok(()) => tracing::debug!("Trash requested: {}", path),
            Err(e) => tracing::warn!("Failed to request trash for {}: {}", path, e),
        }
    }

    async fn compress(
        &self,
        format: CompressionFormat,
        sources: &[ItemPath],
        on_progress: Option<ProgressCallback>,
    ) -> Result<OperationHandle> {
        let destination = generate_compression_destination_path(format, sources)?;
        let destination = differentiate_path(self, &destination)?;

        let source_paths: Vec<String> = sources.iter().map(os_string).collect();
        let destination_path = os_string(&destination);

        tracing::info!("Compressing {} item(s) into {}", sources.len(), destination);
        self.bridge.request(destination, on_progress, move |id| {
            PrivilegedRequest::Compress {
                id,
                format,
                sources: source_paths,
                destination: destination_path,
            }
        })
    }

    async fn extract(
        &self,
        path: &ItemPath,
        on_progress: Option<ProgressCallback>,
    ) -> Result<OperationHandle> {
        let destination = generate_extraction_destination_path(path)?;
        if !self.exists(path) {
            return Err(FsError::at(FsErrorKind::NotExists, path));
        }
        let destination = differentiate_path(self, &destination)?;

        let source_path = os_string(path);
        let destination_path = os_string(&destination);

        tracing::info!("Extracting {} into {}", path, destination);
        self.bridge.request(destination, on_progress, move |id| {
            PrivilegedRequest::Extract {
                id,
                source: source_path,
                destination: destination_path,
            }
        })
    }

    fn watch(&self, path: &ItemPath, callback: WatchCallback) -> Result<()> {
        if !path.is_folder() {
            return Err(FsError::at(FsErrorKind::NotADirectory, path));
        }
        self.watcher.watch(path, callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AutoApprove, AutoDecline};
    use parking_lot::Mutex;
    use std::fs;
    use tempfile::TempDir;

    fn native(limits: ReadLimits) -> NativeFs {
        NativeFs::new(Arc::new(AutoApprove), Bridge::local(), limits)
    }

    fn setup() -> (TempDir, ItemPath, NativeFs) {
        let dir = tempfile::tempdir().unwrap();
        let root = ItemPath::from_native(dir.path(), true);
        (dir, root, native(ReadLimits::default()))
    }

    #[tokio::test]
    async fn test_stats() {
        let (dir, root, fs) = setup();
        fs::write(dir.path().join("empty.txt"), "").unwrap();
        fs::write(dir.path().join("data.bin"), [1u8; 16]).unwrap();

        let empty = fs.get_stats(&root.append("empty.txt", false).unwrap()).await.unwrap();
        assert_eq!(empty.size(), None);

        let data = fs.get_stats(&root.append("data.bin", false).unwrap()).await.unwrap();
        assert_eq!(data.size(), Some(16));

        let folder = fs.get_stats(&root).await.unwrap();
        assert!(matches!(folder, ItemStats::Folder { .. }));

        let err = fs.get_stats(&root.append("missing", false).unwrap()).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotExists));
    }

    #[tokio::test]
    async fn test_get_children() {
        let (dir, root, fs) = setup();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut children = fs.get_children(&root).await.unwrap();
        children.sort_by_key(|item| item.full_path());

        assert_eq!(children.len(), 2);
        assert_eq!(children[0].path(), &root.append("a.txt", false).unwrap());
        assert!(children[0].is_file());
        assert_eq!(children[1].path(), &root.append("sub", true).unwrap());
        assert!(children[1].is_folder());
    }

    #[tokio::test]
    async fn test_exists_checks_both_variants() {
        let (dir, root, fs) = setup();
        fs::create_dir(dir.path().join("sub")).unwrap();

        assert!(fs.exists(&root.append("sub", true).unwrap()));
        assert!(fs.exists(&root.append("sub", false).unwrap()));
        assert!(!fs.exists(&root.append("nope", true).unwrap()));
    }

    #[tokio::test]
    async fn test_create() {
        let (dir, root, fs) = setup();

        fs.create(&root.append("new.txt", false).unwrap()).await.unwrap();
        fs.create(&root.append("new", true).unwrap()).await.unwrap();
        assert!(dir.path().join("new.txt").is_file());
        assert!(dir.path().join("new").is_dir());

        let err = fs.create(&root.append("new.txt", false).unwrap()).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::AlreadyExists));
    }

    #[tokio::test]
    async fn test_declined_create_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = ItemPath::from_native(dir.path(), true);
        let fs = NativeFs::new(Arc::new(AutoDecline), Bridge::local(), ReadLimits::default());

        let path = root.append("new.txt", false).unwrap();
        assert!(matches!(fs.create(&path).await, Err(FsError::Declined(_))));
        assert!(!dir.path().join("new.txt").exists());
    }

    #[tokio::test]
    async fn test_read_file_limits() {
        let dir = tempfile::tempdir().unwrap();
        let root = ItemPath::from_native(dir.path(), true);
        let fs = native(ReadLimits {
            chunk_size: 4,
            max_chunks: 2,
        });
        fs::write(dir.path().join("long.txt"), "abcdefghij").unwrap();
        fs::write(dir.path().join("exact.txt"), "abcdefgh").unwrap();
        fs::write(dir.path().join("short.txt"), "abc").unwrap();

        let long = fs.read_file(&root.append("long.txt", false).unwrap()).await.unwrap();
        assert_eq!(long.chunks, vec![b"abcd".to_vec(), b"efgh".to_vec()]);
        assert!(long.omitted);

        let exact = fs.read_file(&root.append("exact.txt", false).unwrap()).await.unwrap();
        assert_eq!(exact.to_text_lossy(), "abcdefgh");
        assert!(!exact.omitted);

        let short = fs.read_file(&root.append("short.txt", false).unwrap()).await.unwrap();
        assert_eq!(short.chunks, vec![b"abc".to_vec()]);
        assert!(!short.omitted);
    }

    #[tokio::test]
    async fn test_read_file_rejects_folders() {
        let (_dir, root, fs) = setup();

        let err = fs.read_file(&root).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotAFile));

        let err = fs.read_file(&ItemPath::parse("/", true)).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::CannotProcessTheRootFolder));
    }

    #[tokio::test]
    async fn test_duplicate() {
        let (dir, root, fs) = setup();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let source = root.append("a.txt", false).unwrap();

        let first = fs.duplicate(&source).await.unwrap();
        assert_eq!(first, root.append("a_copy.txt", false).unwrap());
        assert_eq!(fs::read_to_string(dir.path().join("a_copy.txt")).unwrap(), "alpha");

        let second = fs.duplicate(&source).await.unwrap();
        assert_eq!(second, root.append("a_copy_copy.txt", false).unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_unsupported() {
        let (dir, root, fs) = setup();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let err = fs.duplicate(&root.append("sub", true).unwrap()).await.unwrap_err();
        assert!(matches!(err, FsError::Unimplemented(_)));

        let err = fs.duplicate(&ItemPath::parse("/", true)).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::CannotProcessTheRootFolder));
    }

    #[tokio::test]
    async fn test_duplicate_folder_as_file_leaves_nothing() {
        let (dir, root, fs) = setup();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let err = fs.duplicate(&root.append("sub", false).unwrap()).await.unwrap_err();
        assert!(matches!(err, FsError::Unimplemented(_)));
        assert!(!dir.path().join("sub_copy").exists());
    }

    #[tokio::test]
    async fn test_rename_into_own_subtree() {
        let (dir, root, fs) = setup();
        fs::create_dir(dir.path().join("usr")).unwrap();
        let usr = root.append("usr", true).unwrap();
        let inner = usr.append("inner", true).unwrap();

        let err = fs.rename(&usr, &inner).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::OperationNotPermitted));
        assert!(dir.path().join("usr").is_dir());
        assert!(!dir.path().join("usr").join("inner").exists());
    }

    #[tokio::test]
    async fn test_invalid_names_rejected() {
        let (dir, root, fs) = setup();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let base = root.full_path();

        let bad = ItemPath::parse(&format!("{}a*b?.txt", base), false);
        let err = fs.create(&bad).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::IncludesIllegalCharacter));

        let bad = ItemPath::parse(&format!("{}x|y.txt", base), false);
        let err = fs.rename(&root.append("a.txt", false).unwrap(), &bad).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::IncludesIllegalCharacter));
        assert!(dir.path().join("a.txt").exists());

        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn test_rename() {
        let (dir, root, fs) = setup();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        let a = root.append("a.txt", false).unwrap();
        let b = root.append("b.txt", false).unwrap();
        let c = root.append("c.txt", false).unwrap();

        let err = fs.rename(&a, &b).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::AlreadyExists));
        assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "b");

        fs.rename(&a, &c).await.unwrap();
        assert!(!fs.exists(&a));
        assert_eq!(fs::read_to_string(dir.path().join("c.txt")).unwrap(), "a");

        let err = fs.rename(&a, &c).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotExists));
    }

    #[tokio::test]
    async fn test_compress_and_extract() {
        let (dir, root, fs) = setup();
        fs::write(dir.path().join("report.txt"), "quarterly").unwrap();
        let source = root.append("report.txt", false).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_callback = seen.clone();
        let handle = fs
            .compress(
                CompressionFormat::Zip,
                &[source],
                Some(Box::new(move |p| seen_by_callback.lock().push(p))),
            )
            .await
            .unwrap();
        assert_eq!(handle.destination(), &root.append("report.zip", false).unwrap());

        let archive = handle.finished().await.unwrap();
        assert!(dir.path().join("report.zip").is_file());
        assert_eq!(seen.lock().last(), Some(&100));

        let handle = fs.extract(&archive, None).await.unwrap();
        let extracted = handle.finished().await.unwrap();
        assert_eq!(extracted, root.append("report", true).unwrap());
        assert_eq!(
            fs::read_to_string(dir.path().join("report").join("report.txt")).unwrap(),
            "quarterly"
        );

        // Second extraction lands next to the first
        let handle = fs.extract(&archive, None).await.unwrap();
        assert_eq!(handle.destination(), &root.append("report_1", true).unwrap());
        handle.finished().await.unwrap();
    }

    #[tokio::test]
    async fn test_extract_rejects_non_archives() {
        let (dir, root, fs) = setup();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let err = fs.extract(&root.append("a.txt", false).unwrap(), None).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::ItemIsNotExtractable));

        let err = fs.extract(&root.append("gone.zip", false).unwrap(), None).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotExists));
    }
}
