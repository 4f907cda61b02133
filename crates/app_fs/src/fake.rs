//! In-memory filesystem backend for development and tests
//!
//! Entries are keyed by canonical full path. Folders keep an ordered child
//! list so listings come back in insertion order.

use crate::bridge::{operation, OperationSink};
use crate::fs::{
    differentiate_path, generate_compression_destination_path,
    generate_extraction_destination_path, get_duplicate_path,
};
use crate::{
    Confirm, FileContent, FileSystem, FsError, FsErrorKind, Item, ItemPath, ItemStats, ItemTimes,
    OperationHandle, ProgressCallback, Result, WatchCallback,
};
use async_trait::async_trait;
use ipc_proto::CompressionFormat;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Delay between simulated progress steps
pub const DEFAULT_PROGRESS_DELAY: Duration = Duration::from_millis(10);

const DESKTOP_INI: &[u8] = b"[.ShellClassInfo]\r\nIconResource=C:\\Windows\\System32\\imageres.dll,-3\r\n";
const WIN32_SYS: &[u8] = &[0x4d, 0x5a, 0x90, 0x00, 0x03, 0x00, 0x00, 0x00, 0x04, 0x00];
/// End-of-central-directory record of an empty zip
const EMPTY_ZIP: &[u8] = &[
    0x50, 0x4b, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

#[derive(Debug, Clone)]
struct FakeEntry {
    path: ItemPath,
    content: Vec<u8>,
    children: Vec<ItemPath>,
    times: ItemTimes,
}

impl FakeEntry {
    fn folder(path: ItemPath, children: Vec<ItemPath>) -> Self {
        Self {
            path,
            content: Vec::new(),
            children,
            times: ItemTimes::now(),
        }
    }

    fn file(path: ItemPath, content: &[u8]) -> Self {
        Self {
            path,
            content: content.to_vec(),
            children: Vec::new(),
            times: ItemTimes::now(),
        }
    }

    fn stats(&self) -> ItemStats {
        if self.path.is_folder() {
            ItemStats::folder(self.times)
        } else {
            ItemStats::file(self.content.len() as u64, self.times)
        }
    }
}

/// Child path built from an already validated name
fn child_of(parent: &ItemPath, name: &str, is_folder: bool) -> ItemPath {
    let mut hierarchy = parent.hierarchy().to_vec();
    hierarchy.push(name.to_string());
    ItemPath::new(parent.drive_letter(), hierarchy, is_folder)
}

/// Entry table and watch slot, shared with simulated operations
struct FakeState {
    entries: RwLock<HashMap<String, FakeEntry>>,
    watch: Mutex<Option<(ItemPath, WatchCallback)>>,
}

impl FakeState {
    fn seeded() -> Self {
        let root = ItemPath::parse("/", true);
        let desktop_ini = ItemPath::parse("/desktop.ini", false);
        let usr = ItemPath::parse("/usr", true);
        let usr_desktop_ini = ItemPath::parse("/usr/desktop.ini", false);
        let win32_sys = ItemPath::parse("/usr/win32.sys", false);

        let entries = [
            FakeEntry::folder(root, vec![desktop_ini.clone(), usr.clone()]),
            FakeEntry::file(desktop_ini, DESKTOP_INI),
            FakeEntry::folder(usr, vec![usr_desktop_ini.clone(), win32_sys.clone()]),
            FakeEntry::file(usr_desktop_ini, DESKTOP_INI),
            FakeEntry::file(win32_sys, WIN32_SYS),
        ];

        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|entry| (entry.path.full_path(), entry))
                    .collect(),
            ),
            watch: Mutex::new(None),
        }
    }

    /// Stored path (with its real folder flag) matching either variant of `path`
    fn resolve(entries: &HashMap<String, FakeEntry>, path: &ItemPath) -> Option<ItemPath> {
        [path.with_folder_flag(true), path.with_folder_flag(false)]
            .into_iter()
            .find(|candidate| entries.contains_key(&candidate.full_path()))
    }

    fn lookup(&self, path: &ItemPath) -> Result<FakeEntry> {
        let entries = self.entries.read();
        Self::resolve(&entries, path)
            .and_then(|resolved| entries.get(&resolved.full_path()).cloned())
            .ok_or_else(|| FsError::at(FsErrorKind::NotExists, path))
    }

    /// Parent of `path`, which must exist as a folder
    fn existing_parent(entries: &HashMap<String, FakeEntry>, path: &ItemPath) -> Result<ItemPath> {
        let parent = path.parent()?;
        match Self::resolve(entries, &parent) {
            Some(found) if found.is_folder() => Ok(found),
            Some(found) => Err(FsError::at(FsErrorKind::NotADirectory, &found)),
            None => Err(FsError::at(FsErrorKind::NotExists, &parent)),
        }
    }

    /// Insert a new entry and link it into its parent
    fn insert(&self, entry: FakeEntry) -> Result<ItemPath> {
        let path = entry.path.clone();
        let parent = {
            let mut entries = self.entries.write();
            if Self::resolve(&entries, &path).is_some() {
                return Err(FsError::at(FsErrorKind::AlreadyExists, &path));
            }

            let parent = Self::existing_parent(&entries, &path)?;
            if let Some(folder) = entries.get_mut(&parent.full_path()) {
                folder.children.push(path.clone());
            }
            entries.insert(path.full_path(), entry);
            parent
        };

        self.notify(&[&parent]);
        Ok(parent)
    }

    fn remove_subtree(entries: &mut HashMap<String, FakeEntry>, path: &ItemPath) {
        if let Some(entry) = entries.remove(&path.full_path()) {
            for child in &entry.children {
                Self::remove_subtree(entries, child);
            }
        }
    }

    /// Re-key `from` and its descendants under `to`
    fn move_subtree(entries: &mut HashMap<String, FakeEntry>, from: &ItemPath, to: &ItemPath) {
        let Some(mut entry) = entries.remove(&from.full_path()) else {
            return;
        };

        let children = std::mem::take(&mut entry.children);
        for child in children {
            let Some(name) = child.name() else {
                continue;
            };
            let moved = child_of(to, name, child.is_folder());
            Self::move_subtree(entries, &child, &moved);
            entry.children.push(moved);
        }

        entry.path = to.clone();
        entries.insert(to.full_path(), entry);
    }

    /// Invoke the watch callback once if any of `parents` is being watched.
    /// Must be called without holding the entry lock.
    fn notify(&self, parents: &[&ItemPath]) {
        let callback = match self.watch.lock().as_ref() {
            Some((watched, callback)) if parents.iter().any(|p| *p == watched) => {
                Some(Arc::clone(callback))
            }
            _ => None,
        };

        if let Some(callback) = callback {
            callback();
        }
    }
}

pub struct FakeFs {
    confirm: Arc<dyn Confirm>,
    state: Arc<FakeState>,
    progress_delay: Duration,
}

impl FakeFs {
    /// Backend seeded with the fixture tree
    pub fn new(confirm: Arc<dyn Confirm>) -> Self {
        Self {
            confirm,
            state: Arc::new(FakeState::seeded()),
            progress_delay: DEFAULT_PROGRESS_DELAY,
        }
    }

    pub fn with_progress_delay(mut self, delay: Duration) -> Self {
        self.progress_delay = delay;
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

    /// Report 50 then 100 on a timer, then create `entry` and finish
    fn simulate(&self, mut sink: OperationSink, entry: FakeEntry) {
        let state = Arc::clone(&self.state);
        let delay = self.progress_delay;

        tokio::spawn(async move {
            for percent in [50, 100] {
                tokio::time::sleep(delay).await;
                if sink.is_cancelled() {
                    tracing::debug!("Simulated request {} cancelled", sink.id());
                    return;
                }
                sink.progress(percent);
            }

            let result = state.insert(entry).map(drop);
            sink.finish(result);
        });
    }
}

#[async_trait]
impl FileSystem for FakeFs {
    fn exists(&self, path: &ItemPath) -> bool {
        FakeState::resolve(&self.state.entries.read(), path).is_some()
    }

    async fn get_stats(&self, path: &ItemPath) -> Result<ItemStats> {
        Ok(self.state.lookup(path)?.stats())
    }

    async fn get_children(&self, path: &ItemPath) -> Result<Vec<Item>> {
        let folder = self.state.lookup(path)?;
        if !folder.path.is_folder() {
            return Err(FsError::at(FsErrorKind::NotADirectory, path));
        }

        let entries = self.state.entries.read();
        let items = folder
            .children
            .iter()
            .filter_map(|child| entries.get(&child.full_path()))
            .map(|entry| Item::new(entry.path.clone(), entry.stats()))
            .collect();
        Ok(items)
    }

    async fn create(&self, path: &ItemPath) -> Result<()> {
        path.identifier()?;
        if self.exists(path) {
            return Err(FsError::at(FsErrorKind::AlreadyExists, path));
        }

        self.confirm(format!("Create {}?", path), path)?;

        let entry = if path.is_folder() {
            FakeEntry::folder(path.clone(), Vec::new())
        } else {
            FakeEntry::file(path.clone(), &[])
        };
        self.state.insert(entry)?;

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

        let entry = self.state.lookup(path)?;
        if entry.path.is_folder() {
            return Err(FsError::at(FsErrorKind::NotAFile, path));
        }

        Ok(FileContent {
            chunks: vec![entry.content],
            omitted: false,
        })
    }

    async fn duplicate(&self, path: &ItemPath) -> Result<ItemPath> {
        if path.is_root() {
            return Err(FsError::at(FsErrorKind::CannotProcessTheRootFolder, path));
        }
        if path.is_folder() {
            return Err(FsError::Unimplemented("folder duplication"));
        }

        let source = self.state.lookup(path)?;
        if source.path.is_folder() {
            return Err(FsError::Unimplemented("folder duplication"));
        }

        let target = get_duplicate_path(self, path)?;
        self.confirm(format!("Duplicate {} as {}?", path, target), &target)?;

        self.state.insert(FakeEntry::file(target.clone(), &source.content))?;

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

        let (from_parent, to_parent) = {
            let mut entries = self.state.entries.write();
            let source = FakeState::resolve(&entries, from)
                .ok_or_else(|| FsError::at(FsErrorKind::NotExists, from))?;
            let target = to.with_folder_flag(source.is_folder());

            let from_parent = source.parent()?;
            let to_parent = FakeState::existing_parent(&entries, &target)?;

            FakeState::move_subtree(&mut entries, &source, &target);

            if from_parent == to_parent {
                if let Some(folder) = entries.get_mut(&from_parent.full_path()) {
                    for child in folder.children.iter_mut().filter(|c| **c == source) {
                        *child = target.clone();
                    }
                }
            } else {
                if let Some(folder) = entries.get_mut(&from_parent.full_path()) {
                    folder.children.retain(|c| *c != source);
                }
                if let Some(folder) = entries.get_mut(&to_parent.full_path()) {
                    folder.children.push(target.clone());
                }
            }

            (from_parent, to_parent)
        };

        self.state.notify(&[&from_parent, &to_parent]);

        tracing::info!("Renamed: {} -> {}", from, to);
        Ok(())
    }

    fn trash(&self, path: &ItemPath) {
        if path.is_root() {
            tracing::warn!("Refusing to trash the root folder: {}", path);
            return;
        }

        let parent = {
            let mut entries = self.state.entries.write();
            let Some(resolved) = FakeState::resolve(&entries, path) else {
                tracing::warn!("Failed to trash {}: not found", path);
                return;
            };

            FakeState::remove_subtree(&mut entries, &resolved);

            let Ok(parent) = resolved.parent() else {
                return;
            };
            if let Some(folder) = entries.get_mut(&parent.full_path()) {
                folder.children.retain(|c| *c != resolved);
            }
            parent
        };

        self.state.notify(&[&parent]);
        tracing::info!("Moved to trash: {}", path);
    }

    async fn compress(
        &self,
        format: CompressionFormat,
        sources: &[ItemPath],
        on_progress: Option<ProgressCallback>,
    ) -> Result<OperationHandle> {
        let destination = generate_compression_destination_path(format, sources)?;
        if let Some(missing) = sources.iter().find(|source| !self.exists(source)) {
            return Err(FsError::at(FsErrorKind::NotExists, missing));
        }
        let destination = differentiate_path(self, &destination)?;

        let content = match format {
            CompressionFormat::Zip => EMPTY_ZIP,
            CompressionFormat::TarGz => &[],
        };

        let (handle, sink) = operation(destination.clone(), on_progress);
        self.simulate(sink, FakeEntry::file(destination, content));
        Ok(handle)
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

        let (handle, sink) = operation(destination.clone(), on_progress);
        self.simulate(sink, FakeEntry::folder(destination, Vec::new()));
        Ok(handle)
    }

    fn watch(&self, path: &ItemPath, callback: WatchCallback) -> Result<()> {
        let folder = self.state.lookup(path)?;
        if !folder.path.is_folder() {
            return Err(FsError::at(FsErrorKind::NotADirectory, path));
        }

        *self.state.watch.lock() = Some((folder.path, callback));
        tracing::info!("Watching: {}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AutoApprove, AutoDecline, ItemKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fake() -> FakeFs {
        FakeFs::new(Arc::new(AutoApprove)).with_progress_delay(Duration::from_millis(1))
    }

    fn p(raw: &str) -> ItemPath {
        ItemPath::parse(raw, raw.ends_with('/'))
    }

    fn names(items: &[Item]) -> Vec<String> {
        items.iter().map(|item| item.full_path()).collect()
    }

    fn counter() -> (Arc<AtomicUsize>, WatchCallback) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        (calls, Arc::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[tokio::test]
    async fn test_list_root_fixture() {
        let fs = fake();
        let children = fs.get_children(&p("/")).await.unwrap();

        assert_eq!(names(&children), vec!["/desktop.ini", "/usr/"]);
        assert_eq!(children[0].kind(), ItemKind::File);
        assert_eq!(children[1].kind(), ItemKind::Folder);
    }

    #[tokio::test]
    async fn test_exists_ignores_folder_flag() {
        let fs = fake();
        assert!(fs.exists(&p("/usr/")));
        assert!(fs.exists(&p("/usr")));
        assert!(fs.exists(&p("/usr/win32.sys/")));
        assert!(!fs.exists(&p("/etc/")));
    }

    #[tokio::test]
    async fn test_duplicate_file() {
        let fs = fake();
        let dup = fs.duplicate(&p("/desktop.ini")).await.unwrap();
        assert_eq!(dup, p("/desktop_copy.ini"));

        let children = fs.get_children(&p("/")).await.unwrap();
        assert_eq!(names(&children), vec!["/desktop.ini", "/usr/", "/desktop_copy.ini"]);

        let copy = fs.read_file(&dup).await.unwrap();
        assert_eq!(copy.chunks, vec![DESKTOP_INI.to_vec()]);

        let again = fs.duplicate(&p("/desktop.ini")).await.unwrap();
        assert_eq!(again, p("/desktop_copy_copy.ini"));
    }

    #[tokio::test]
    async fn test_duplicate_rejects_root_and_folders() {
        let fs = fake();
        let err = fs.duplicate(&p("/")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::CannotProcessTheRootFolder));

        let err = fs.duplicate(&p("/usr/")).await.unwrap_err();
        assert!(matches!(err, FsError::Unimplemented(_)));

        let err = fs.duplicate(&p("/nope.txt")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotExists));
    }

    #[tokio::test]
    async fn test_rename_triggers_watch_once() {
        let fs = fake();
        let (calls, callback) = counter();
        fs.watch(&p("/usr/"), callback).unwrap();

        fs.rename(&p("/usr/win32.sys"), &p("/usr/win64.sys")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let children = fs.get_children(&p("/usr/")).await.unwrap();
        assert_eq!(names(&children), vec!["/usr/desktop.ini", "/usr/win64.sys"]);
    }

    #[tokio::test]
    async fn test_new_watch_supersedes_old() {
        let fs = fake();
        let (first, callback) = counter();
        fs.watch(&p("/"), callback).unwrap();
        let (second, callback) = counter();
        fs.watch(&p("/usr/"), callback).unwrap();

        fs.create(&p("/notes.txt")).await.unwrap();
        fs.create(&p("/usr/notes.txt")).await.unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_watch_requires_existing_folder() {
        let fs = fake();
        let (_, callback) = counter();
        let err = fs.watch(&p("/etc/"), callback.clone()).unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotExists));

        let err = fs.watch(&p("/desktop.ini"), callback).unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotADirectory));
    }

    #[tokio::test]
    async fn test_rename_folder_moves_descendants() {
        let fs = fake();
        fs.rename(&p("/usr/"), &p("/opt/")).await.unwrap();

        assert!(!fs.exists(&p("/usr/")));
        assert!(!fs.exists(&p("/usr/win32.sys")));
        assert!(fs.exists(&p("/opt/win32.sys")));

        let root = fs.get_children(&p("/")).await.unwrap();
        assert_eq!(names(&root), vec!["/desktop.ini", "/opt/"]);
    }

    #[tokio::test]
    async fn test_rename_errors() {
        let fs = fake();
        let err = fs.rename(&p("/desktop.ini"), &p("/usr/")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::AlreadyExists));

        let err = fs.rename(&p("/gone.txt"), &p("/here.txt")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotExists));

        let err = fs.rename(&p("/"), &p("/root/")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::CannotProcessTheRootFolder));
    }

    #[tokio::test]
    async fn test_rename_into_own_subtree() {
        let fs = fake();
        let err = fs.rename(&p("/usr/"), &p("/usr/inner/")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::OperationNotPermitted));

        assert!(fs.exists(&p("/usr/")));
        assert!(!fs.exists(&p("/usr/inner/")));
        let root = fs.get_children(&p("/")).await.unwrap();
        assert_eq!(names(&root), vec!["/desktop.ini", "/usr/"]);
    }

    #[tokio::test]
    async fn test_invalid_names_rejected() {
        let fs = fake();

        let err = fs.create(&p("/a*b?.txt")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::IncludesIllegalCharacter));
        assert!(!fs.exists(&p("/a*b?.txt")));

        let err = fs.create(&p("/ .. ")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::EmptyIdentifier));

        let err = fs.rename(&p("/desktop.ini"), &p("/x|y.ini")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::IncludesIllegalCharacter));
        assert!(fs.exists(&p("/desktop.ini")));
        assert!(!fs.exists(&p("/x|y.ini")));
    }

    #[tokio::test]
    async fn test_create_and_stats() {
        let fs = fake();
        let path = p("/usr/empty.log");
        fs.create(&path).await.unwrap();

        let stats = fs.get_stats(&path).await.unwrap();
        assert_eq!(stats.size(), None);

        let stats = fs.get_stats(&p("/usr/win32.sys")).await.unwrap();
        assert_eq!(stats.size(), Some(WIN32_SYS.len() as u64));

        let err = fs.create(&path).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::AlreadyExists));

        let err = fs.create(&p("/missing/a.txt")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotExists));
    }

    #[tokio::test]
    async fn test_declined_operations_change_nothing() {
        let fs = FakeFs::new(Arc::new(AutoDecline));

        let err = fs.create(&p("/new/")).await.unwrap_err();
        assert!(matches!(err, FsError::Declined(_)));
        assert!(!fs.exists(&p("/new/")));

        let err = fs.rename(&p("/desktop.ini"), &p("/x.ini")).await.unwrap_err();
        assert!(matches!(err, FsError::Declined(_)));
        assert!(fs.exists(&p("/desktop.ini")));
    }

    #[tokio::test]
    async fn test_read_file() {
        let fs = fake();
        let content = fs.read_file(&p("/usr/win32.sys")).await.unwrap();
        assert_eq!(content.chunks.len(), 1);
        assert!(!content.omitted);
        assert!(content.is_binary());

        let err = fs.read_file(&p("/usr/")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotAFile));

        let err = fs.read_file(&p("/")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::CannotProcessTheRootFolder));
    }

    #[tokio::test]
    async fn test_trash_removes_subtree() {
        let fs = fake();
        let (calls, callback) = counter();
        fs.watch(&p("/"), callback).unwrap();

        fs.trash(&p("/usr/"));

        assert!(!fs.exists(&p("/usr/")));
        assert!(!fs.exists(&p("/usr/desktop.ini")));
        assert_eq!(names(&fs.get_children(&p("/")).await.unwrap()), vec!["/desktop.ini"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compress_then_extract() {
        let fs = fake();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_callback = seen.clone();

        let handle = fs
            .compress(
                CompressionFormat::Zip,
                &[p("/usr/")],
                Some(Box::new(move |percent| seen_by_callback.lock().push(percent))),
            )
            .await
            .unwrap();
        let archive = handle.finished().await.unwrap();

        assert_eq!(archive, p("/usr.zip"));
        assert!(fs.exists(&archive));
        assert_eq!(*seen.lock(), vec![50, 100]);

        let extracted = fs.extract(&archive, None).await.unwrap().finished().await.unwrap();
        // `/usr/` is taken, so the destination is differentiated
        assert_eq!(extracted, p("/usr_1/"));
        assert!(fs.exists(&extracted));
    }

    #[tokio::test]
    async fn test_cancelled_compress_creates_nothing() {
        let fs = FakeFs::new(Arc::new(AutoApprove)).with_progress_delay(Duration::from_millis(50));
        let handle = fs
            .compress(CompressionFormat::TarGz, &[p("/desktop.ini")], None)
            .await
            .unwrap();
        assert_eq!(handle.destination(), &p("/desktop.tgz"));

        handle.cancel();
        assert!(matches!(handle.finished().await, Err(FsError::Cancelled)));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!fs.exists(&p("/desktop.tgz")));
    }

    #[tokio::test]
    async fn test_compress_errors() {
        let fs = fake();
        let err = fs.compress(CompressionFormat::Zip, &[], None).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NoPathProvided));

        let err = fs
            .compress(CompressionFormat::Zip, &[p("/gone.txt")], None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::NotExists));

        let err = fs.extract(&p("/desktop.ini"), None).await.unwrap_err();
        assert_eq!(err.kind(), Some(FsErrorKind::ItemIsNotExtractable));
    }
}
