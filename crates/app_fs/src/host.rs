//! In-process privileged host
//!
//! Executes trash, compress and extract requests on worker threads and
//! reports back through encoded [`PrivilegedEvent`] frames. Failures are
//! sent as errno-prefixed messages so the client can classify them.

use crate::bridge::PrivilegedTransport;
use crate::{FsError, FsErrorKind, Result};
use ipc_proto::{CompressionFormat, PrivilegedEvent, PrivilegedRequest};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Errors raised while running a request on the host
#[derive(Debug, thiserror::Error)]
enum HostError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{0}")]
    SevenZip(String),

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Cancelled")]
    Cancelled,
}

impl HostError {
    /// Message sent on the wire, errno-prefixed when the cause is known
    fn wire_message(&self) -> String {
        let io_err = match self {
            HostError::Io(e) => Some(e),
            HostError::Zip(zip::result::ZipError::Io(e)) => Some(e),
            _ => None,
        };

        match io_err
            .and_then(FsErrorKind::from_io)
            .and_then(|kind| kind.wire_prefix())
        {
            Some(prefix) => format!("{} {}", prefix, self),
            None => self.to_string(),
        }
    }
}

type HostResult<T> = std::result::Result<T, HostError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    Zip,
    SevenZip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    /// Detect archive format from the file name
    fn detect(path: &Path) -> HostResult<Self> {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") || name.ends_with(".gz") {
            return Ok(ArchiveFormat::TarGz);
        }

        let ext = path
            .extension()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "7z" => Ok(ArchiveFormat::SevenZip),
            "tar" => Ok(ArchiveFormat::Tar),
            _ => Err(HostError::UnsupportedFormat(ext)),
        }
    }
}

/// Reports progress for one request
struct Emitter {
    id: Uuid,
    events: mpsc::UnboundedSender<Vec<u8>>,
    token: CancellationToken,
}

impl Emitter {
    fn emit(&self, event: PrivilegedEvent) {
        if self.token.is_cancelled() {
            return;
        }

        match ipc_proto::encode(&event) {
            Ok(frame) => {
                let _ = self.events.send(frame);
            }
            Err(e) => tracing::error!("Failed to encode event for {}: {}", self.id, e),
        }
    }

    fn progress(&self, done: usize, total: usize) {
        let percent = if total == 0 { 100 } else { done * 100 / total };
        self.emit(PrivilegedEvent::progress(self.id, percent as u8));
    }

    fn check(&self) -> HostResult<()> {
        if self.token.is_cancelled() {
            Err(HostError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn finish(&self, result: HostResult<()>) {
        match result {
            Ok(()) => self.emit(PrivilegedEvent::end(self.id)),
            Err(HostError::Cancelled) => tracing::debug!("Request {} stopped", self.id),
            Err(e) => self.emit(PrivilegedEvent::error(self.id, e.wire_message())),
        }
    }
}

pub struct LocalHost {
    events: mpsc::UnboundedSender<Vec<u8>>,
    running: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
}

impl LocalHost {
    /// Host that writes event frames to `events`
    pub fn new(events: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            events,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn handle(&self, request: PrivilegedRequest) {
        match request {
            PrivilegedRequest::Trash { path } => {
                std::thread::spawn(move || trash_item(Path::new(&path)));
            }
            PrivilegedRequest::Compress {
                id,
                format,
                sources,
                destination,
            } => {
                self.spawn(id, move |emitter| {
                    let sources: Vec<PathBuf> = sources.iter().map(PathBuf::from).collect();
                    compress(&emitter, format, &sources, Path::new(&destination))
                });
            }
            PrivilegedRequest::Extract {
                id,
                source,
                destination,
            } => {
                self.spawn(id, move |emitter| {
                    extract(&emitter, Path::new(&source), Path::new(&destination))
                });
            }
            PrivilegedRequest::Cancel { id } => {
                if let Some(token) = self.running.lock().remove(&id) {
                    token.cancel();
                    tracing::info!("Cancelled request {}", id);
                }
            }
        }
    }

    fn spawn<F>(&self, id: Uuid, job: F)
    where
        F: FnOnce(&Emitter) -> HostResult<()> + Send + 'static,
    {
        let token = CancellationToken::new();
        self.running.lock().insert(id, token.clone());

        let emitter = Emitter {
            id,
            events: self.events.clone(),
            token,
        };
        let running = Arc::clone(&self.running);

        std::thread::spawn(move || {
            emitter.emit(PrivilegedEvent::progress(id, 0));
            let result = job(&emitter);
            running.lock().remove(&id);
            emitter.finish(result);
        });
    }
}

impl PrivilegedTransport for LocalHost {
    fn send(&self, frame: Vec<u8>) -> Result<()> {
        let request = ipc_proto::decode::<PrivilegedRequest>(&frame)
            .map_err(|e| FsError::Channel(e.to_string()))?;
        self.handle(request);
        Ok(())
    }
}

#[cfg(feature = "trash-support")]
fn trash_item(path: &Path) {
    match trash::delete(path) {
        Ok(()) => tracing::info!("Moved to trash: {}", path.display()),
        Err(e) => tracing::warn!("Failed to trash {}: {}", path.display(), e),
    }
}

#[cfg(not(feature = "trash-support"))]
fn trash_item(path: &Path) {
    tracing::warn!("Trash support disabled, keeping {}", path.display());
}

/// File or folder to put into an archive
struct ArchiveEntry {
    path: PathBuf,
    name: String,
    is_dir: bool,
}

fn collect_entries(sources: &[PathBuf]) -> HostResult<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();

    for source in sources {
        let name = source
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source has no name"))?;
        collect_into(source, name, &mut entries)?;
    }

    Ok(entries)
}

fn collect_into(path: &Path, name: String, entries: &mut Vec<ArchiveEntry>) -> HostResult<()> {
    let metadata = fs::metadata(path)?;

    if !metadata.is_dir() {
        entries.push(ArchiveEntry {
            path: path.to_path_buf(),
            name,
            is_dir: false,
        });
        return Ok(());
    }

    entries.push(ArchiveEntry {
        path: path.to_path_buf(),
        name: format!("{}/", name),
        is_dir: true,
    });

    let mut children: Vec<_> = fs::read_dir(path)?.collect::<io::Result<_>>()?;
    children.sort_by_key(|entry| entry.file_name());

    for child in children {
        let child_name = format!("{}/{}", name, child.file_name().to_string_lossy());
        collect_into(&child.path(), child_name, entries)?;
    }

    Ok(())
}

fn compress(
    emitter: &Emitter,
    format: CompressionFormat,
    sources: &[PathBuf],
    destination: &Path,
) -> HostResult<()> {
    let entries = collect_entries(sources)?;
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)?;

    let result = match format {
        CompressionFormat::Zip => write_zip(emitter, file, &entries),
        CompressionFormat::TarGz => write_tar_gz(emitter, file, &entries),
    };

    if result.is_err() {
        let _ = fs::remove_file(destination);
    } else {
        tracing::info!("Compressed {} entries into {}", entries.len(), destination.display());
    }

    result
}

fn write_zip(emitter: &Emitter, file: File, entries: &[ArchiveEntry]) -> HostResult<()> {
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for (i, entry) in entries.iter().enumerate() {
        emitter.check()?;

        if entry.is_dir {
            zip.add_directory(entry.name.as_str(), options)?;
        } else {
            zip.start_file(entry.name.as_str(), options)?;
            io::copy(&mut File::open(&entry.path)?, &mut zip)?;
        }

        emitter.progress(i + 1, entries.len());
    }

    zip.finish()?;
    Ok(())
}

fn write_tar_gz(emitter: &Emitter, file: File, entries: &[ArchiveEntry]) -> HostResult<()> {
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (i, entry) in entries.iter().enumerate() {
        emitter.check()?;

        if entry.is_dir {
            builder.append_dir(entry.name.trim_end_matches('/'), &entry.path)?;
        } else {
            builder.append_path_with_name(&entry.path, &entry.name)?;
        }

        emitter.progress(i + 1, entries.len());
    }

    builder.into_inner()?.finish()?;
    Ok(())
}

fn extract(emitter: &Emitter, source: &Path, destination: &Path) -> HostResult<()> {
    let format = ArchiveFormat::detect(source)?;
    // Fail before creating anything when the source is missing
    fs::metadata(source)?;
    fs::create_dir(destination)?;

    let result = match format {
        ArchiveFormat::Zip => extract_zip(emitter, source, destination),
        ArchiveFormat::SevenZip => extract_7z(emitter, source, destination),
        ArchiveFormat::Tar | ArchiveFormat::TarGz => {
            extract_tar(emitter, format, source, destination)
        }
    };

    match &result {
        Ok(()) => tracing::info!("Extracted {} into {}", source.display(), destination.display()),
        Err(_) => {
            let _ = fs::remove_dir_all(destination);
        }
    }

    result
}

fn extract_zip(emitter: &Emitter, source: &Path, destination: &Path) -> HostResult<()> {
    let mut archive = zip::ZipArchive::new(File::open(source)?)?;
    let total = archive.len();

    for i in 0..total {
        emitter.check()?;

        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping unsafe entry: {}", entry.name());
            continue;
        };
        let target = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
        }

        emitter.progress(i + 1, total);
    }

    Ok(())
}

fn extract_7z(emitter: &Emitter, source: &Path, destination: &Path) -> HostResult<()> {
    emitter.check()?;
    sevenz_rust::decompress_file(source, destination)
        .map_err(|e| HostError::SevenZip(e.to_string()))?;
    emitter.progress(1, 1);
    Ok(())
}

fn tar_reader(format: ArchiveFormat, source: &Path) -> HostResult<tar::Archive<Box<dyn Read>>> {
    let file = File::open(source)?;
    let reader: Box<dyn Read> = match format {
        ArchiveFormat::TarGz => Box::new(flate2::read::GzDecoder::new(file)),
        _ => Box::new(file),
    };
    Ok(tar::Archive::new(reader))
}

fn extract_tar(
    emitter: &Emitter,
    format: ArchiveFormat,
    source: &Path,
    destination: &Path,
) -> HostResult<()> {
    let total = tar_reader(format, source)?.entries()?.count();
    let mut archive = tar_reader(format, source)?;

    for (i, entry) in archive.entries()?.enumerate() {
        emitter.check()?;
        entry?.unpack_in(destination)?;
        emitter.progress(i + 1, total);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipc_proto::EventKind;
    use std::io::Write;
    use std::time::Duration;

    fn host() -> (LocalHost, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (LocalHost::new(tx), rx)
    }

    /// Collect events for `id` until a terminal one arrives
    async fn events_until_terminal(
        rx: &mut mpsc::UnboundedReceiver<Vec<u8>>,
        id: Uuid,
    ) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .unwrap()
                .unwrap();
            let event: PrivilegedEvent = ipc_proto::decode(&frame).unwrap();
            if event.id != id {
                continue;
            }
            let terminal = event.kind.is_terminal();
            kinds.push(event.kind);
            if terminal {
                return kinds;
            }
        }
    }

    fn send(host: &LocalHost, request: &PrivilegedRequest) {
        host.send(ipc_proto::encode(request).unwrap()).unwrap();
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ArchiveFormat::detect(Path::new("a.zip")).unwrap(), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::detect(Path::new("a.7Z")).unwrap(), ArchiveFormat::SevenZip);
        assert_eq!(ArchiveFormat::detect(Path::new("a.tar")).unwrap(), ArchiveFormat::Tar);
        assert_eq!(ArchiveFormat::detect(Path::new("a.tar.gz")).unwrap(), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::detect(Path::new("a.tgz")).unwrap(), ArchiveFormat::TarGz);
        assert!(ArchiveFormat::detect(Path::new("a.rar")).is_err());
    }

    #[test]
    fn test_wire_message_prefix() {
        let err = HostError::Io(io::Error::from(io::ErrorKind::NotFound));
        assert!(err.wire_message().starts_with("ENOENT:"));

        let err = HostError::UnsupportedFormat("rar".into());
        assert_eq!(err.wire_message(), "Unsupported archive format: rar");
    }

    #[tokio::test]
    async fn test_compress_then_extract_zip() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("docs");
        fs::create_dir(&folder).unwrap();
        File::create(folder.join("a.txt"))
            .unwrap()
            .write_all(b"alpha")
            .unwrap();

        let (host, mut rx) = host();
        let archive = dir.path().join("docs.zip");
        let id = ipc_proto::request_id();
        send(
            &host,
            &PrivilegedRequest::Compress {
                id,
                format: CompressionFormat::Zip,
                sources: vec![folder.to_string_lossy().to_string()],
                destination: archive.to_string_lossy().to_string(),
            },
        );

        let kinds = events_until_terminal(&mut rx, id).await;
        assert_eq!(kinds.first(), Some(&EventKind::Progress(0)));
        assert_eq!(kinds.last(), Some(&EventKind::End));
        assert!(archive.exists());

        let out = dir.path().join("docs_out");
        let id = ipc_proto::request_id();
        send(
            &host,
            &PrivilegedRequest::Extract {
                id,
                source: archive.to_string_lossy().to_string(),
                destination: out.to_string_lossy().to_string(),
            },
        );

        let kinds = events_until_terminal(&mut rx, id).await;
        assert_eq!(kinds.last(), Some(&EventKind::End));
        assert_eq!(fs::read(out.join("docs").join("a.txt")).unwrap(), b"alpha");
    }

    #[tokio::test]
    async fn test_compress_tar_gz_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.md");
        fs::write(&file, "# notes").unwrap();

        let (host, mut rx) = host();
        let archive = dir.path().join("notes.tgz");
        let id = ipc_proto::request_id();
        send(
            &host,
            &PrivilegedRequest::Compress {
                id,
                format: CompressionFormat::TarGz,
                sources: vec![file.to_string_lossy().to_string()],
                destination: archive.to_string_lossy().to_string(),
            },
        );
        assert_eq!(events_until_terminal(&mut rx, id).await.last(), Some(&EventKind::End));

        let out = dir.path().join("notes");
        let id = ipc_proto::request_id();
        send(
            &host,
            &PrivilegedRequest::Extract {
                id,
                source: archive.to_string_lossy().to_string(),
                destination: out.to_string_lossy().to_string(),
            },
        );
        assert_eq!(events_until_terminal(&mut rx, id).await.last(), Some(&EventKind::End));
        assert_eq!(fs::read_to_string(out.join("notes.md")).unwrap(), "# notes");
    }

    #[tokio::test]
    async fn test_extract_missing_source_reports_enoent() {
        let dir = tempfile::tempdir().unwrap();
        let (host, mut rx) = host();
        let id = ipc_proto::request_id();
        send(
            &host,
            &PrivilegedRequest::Extract {
                id,
                source: dir.path().join("gone.zip").to_string_lossy().to_string(),
                destination: dir.path().join("gone").to_string_lossy().to_string(),
            },
        );

        match events_until_terminal(&mut rx, id).await.last() {
            Some(EventKind::Error(message)) => assert!(message.starts_with("ENOENT:"), "{message}"),
            other => panic!("unexpected terminal event: {other:?}"),
        }
        assert!(!dir.path().join("gone").exists());
    }

    #[tokio::test]
    async fn test_compress_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "a").unwrap();
        let archive = dir.path().join("a.zip");
        fs::write(&archive, "already here").unwrap();

        let (host, mut rx) = host();
        let id = ipc_proto::request_id();
        send(
            &host,
            &PrivilegedRequest::Compress {
                id,
                format: CompressionFormat::Zip,
                sources: vec![file.to_string_lossy().to_string()],
                destination: archive.to_string_lossy().to_string(),
            },
        );

        match events_until_terminal(&mut rx, id).await.last() {
            Some(EventKind::Error(message)) => assert!(message.starts_with("EEXIST:"), "{message}"),
            other => panic!("unexpected terminal event: {other:?}"),
        }
        assert_eq!(fs::read_to_string(&archive).unwrap(), "already here");
    }
}
