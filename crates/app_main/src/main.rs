//! Filer - file manager core driven from the command line
//!
//! Main entry point. Wires configuration, logging and the selected
//! filesystem backend, then runs one command.

mod commands;
mod prompt;

use anyhow::Result;
use app_core::{AppError, DeploymentMode, FilerConfig};
use app_fs::CompressionFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

/// Filer - browse and manage files
#[derive(Parser)]
#[command(name = "filer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run against the in-memory fixture tree
    #[arg(long, global = true)]
    fake: bool,

    /// Approve every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "FILER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the children of a folder
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Show the stats of an item
    Stat { path: String },

    /// Create an empty file or folder
    Create {
        path: String,

        /// Create a folder instead of a file
        #[arg(short, long)]
        folder: bool,
    },

    /// Print the beginning of a file
    Cat { path: String },

    /// Copy a file next to itself
    Dup { path: String },

    /// Rename an item
    Rename { from: String, to: String },

    /// Move an item to the trash
    Trash { path: String },

    /// Pack items into an archive
    Compress {
        #[arg(required = true)]
        paths: Vec<String>,

        #[arg(short, long, value_enum, default_value = "zip")]
        format: FormatArg,
    },

    /// Unpack an archive into a sibling folder
    Extract { path: String },

    /// Report changes in a folder until interrupted
    Watch { path: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Zip,
    Tgz,
}

impl From<FormatArg> for CompressionFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Zip => CompressionFormat::Zip,
            FormatArg::Tgz => CompressionFormat::TarGz,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FilerConfig::load_from(path)?,
        None => FilerConfig::load().unwrap_or_default(),
    };

    if cli.fake {
        config.general.mode = DeploymentMode::Development;
    }
    if cli.yes {
        config.fs.confirm_operations = false;
    }

    // Initialize logging and panic hook first
    let log_guard = app_log::init(config.general.log_retention_days)?;

    tracing::info!("Filer starting in {:?} mode", config.general.mode);

    let fs = app_core::select_backend(&config, Arc::new(prompt::TerminalConfirm));

    let result = commands::run(&fs, cli.command).await;
    if let Err(e) = &result {
        report(e);
    }

    // Flush the log file before a non-zero exit
    drop(log_guard);
    if result.is_err() {
        std::process::exit(1);
    }

    Ok(())
}

fn report(e: &AppError) {
    tracing::error!("Command failed: {}", e);
    eprintln!("{}", e.user_message());
}
