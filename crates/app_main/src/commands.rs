//! Command implementations

use crate::Commands;
use app_core::AppError;
use app_fs::{
    CompressionFormat, Fs, FsError, FsErrorKind, Item, ItemKind, ItemPath, ItemProperty,
    OperationHandle, ProgressCallback,
};
use std::time::Duration;

type Result<T> = std::result::Result<T, AppError>;

/// How long `trash` waits for the host to remove the item
const TRASH_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) async fn run(fs: &Fs, command: Commands) -> Result<()> {
    match command {
        Commands::Ls { path } => list(fs, &path).await,
        Commands::Stat { path } => stat(fs, &path).await,
        Commands::Create { path, folder } => {
            let path = ItemPath::parse(&path, folder);
            fs.create(&path).await?;
            println!("Created {}", path);
            Ok(())
        }
        Commands::Cat { path } => cat(fs, &path).await,
        Commands::Dup { path } => {
            let path = resolve(fs, &path).await;
            let copy = fs.duplicate(&path).await?;
            println!("{}", copy);
            Ok(())
        }
        Commands::Rename { from, to } => {
            let from = resolve(fs, &from).await;
            let to = ItemPath::parse(&to, from.is_folder());
            fs.rename(&from, &to).await?;
            println!("Renamed {} -> {}", from, to);
            Ok(())
        }
        Commands::Trash { path } => trash(fs, &path).await,
        Commands::Compress { paths, format } => {
            let mut sources = Vec::with_capacity(paths.len());
            for raw in &paths {
                sources.push(resolve(fs, raw).await);
            }
            let format = CompressionFormat::from(format);
            let handle = fs.compress(format, &sources, Some(progress_printer())).await?;
            wait(handle).await
        }
        Commands::Extract { path } => {
            let path = resolve(fs, &path).await;
            let handle = fs.extract(&path, Some(progress_printer())).await?;
            wait(handle).await
        }
        Commands::Watch { path } => watch(fs, &path).await,
    }
}

/// Parse a raw path, taking the folder flag from the backend when the item exists
async fn resolve(fs: &Fs, raw: &str) -> ItemPath {
    let path = ItemPath::parse(raw, raw.ends_with(['/', '\\']));
    if path.is_root() {
        return path.with_folder_flag(true);
    }

    match fs.get_stats(&path).await {
        Ok(stats) => path.with_folder_flag(stats.kind() == ItemKind::Folder),
        Err(_) => path,
    }
}

async fn list(fs: &Fs, raw: &str) -> Result<()> {
    let path = resolve(fs, raw).await;
    if !path.is_folder() {
        return Err(FsError::at(FsErrorKind::NotADirectory, &path).into());
    }

    for item in fs.get_children(&path).await? {
        println!("{}", format_row(&item));
    }
    Ok(())
}

fn format_row(item: &Item) -> String {
    format!(
        "{:<10} {:>12} {:>10}  {}",
        item.property_value(ItemProperty::Icon),
        item.property_value(ItemProperty::Size),
        item.property_value(ItemProperty::LastModified),
        item.property_value(ItemProperty::Name),
    )
}

async fn stat(fs: &Fs, raw: &str) -> Result<()> {
    let path = resolve(fs, raw).await;
    let stats = fs.get_stats(&path).await?;

    println!("Path:          {}", path);
    println!("Kind:          {:?}", stats.kind());
    if let Some(size) = stats.size() {
        println!("Size:          {} bytes", size);
    } else if stats.kind() == ItemKind::File {
        println!("Size:          unknown");
    }
    println!("Created:       {}", stats.created().to_rfc3339());
    println!("Last accessed: {}", stats.last_accessed().to_rfc3339());
    println!("Last modified: {}", stats.last_modified().to_rfc3339());
    Ok(())
}

async fn cat(fs: &Fs, raw: &str) -> Result<()> {
    let path = resolve(fs, raw).await;
    let content = fs.read_file(&path).await?;

    if content.is_binary() {
        println!("<binary, {} bytes shown>", content.len());
    } else {
        print!("{}", content.to_text_lossy());
    }
    if content.omitted {
        println!("\n... (truncated)");
    }
    Ok(())
}

async fn trash(fs: &Fs, raw: &str) -> Result<()> {
    let path = resolve(fs, raw).await;
    if !fs.exists(&path) {
        return Err(FsError::at(FsErrorKind::NotExists, &path).into());
    }

    fs.trash(&path);

    // Trash is fire-and-forget; poll so the process does not exit first
    let deadline = tokio::time::Instant::now() + TRASH_TIMEOUT;
    while fs.exists(&path) {
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!("{} still present after trash request", path);
            println!("Trash requested for {}", path);
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    println!("Trashed {}", path);
    Ok(())
}

fn progress_printer() -> ProgressCallback {
    Box::new(|percent| eprint!("\r{:>3}%", percent))
}

/// Wait for an operation, cancelling it on Ctrl-C
async fn wait(handle: OperationHandle) -> Result<()> {
    let token = handle.cancellation_token();
    let canceller = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let result = handle.finished().await;
    canceller.abort();
    eprintln!();

    let destination = result?;
    println!("{}", destination);
    Ok(())
}

async fn watch(fs: &Fs, raw: &str) -> Result<()> {
    let path = resolve(fs, raw).await.with_folder_flag(true);
    let watched = path.clone();

    fs.watch(
        &path,
        std::sync::Arc::new(move || println!("Changed: {}", watched)),
    )?;

    println!("Watching {} (Ctrl-C to stop)", path);
    tokio::signal::ctrl_c().await?;
    Ok(())
}
