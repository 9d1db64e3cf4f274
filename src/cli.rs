//! Command-line surface and the progress-bar consumer task

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use tokio::sync::mpsc;

use crate::catalog::Catalog;
use crate::error::LauncherError;
use crate::installer::Installer;
use crate::launch;
use crate::platform::Platform;
use crate::progress::{EVENT_CHANNEL_CAPACITY, InstallEvent, format_bytes};
use crate::releases::ReleaseClient;

/// Command-line arguments for godot-launcher
#[derive(Parser)]
#[command(name = "godot-launcher")]
#[command(version, about = "Manage and launch Godot engine builds")]
pub struct Cli {
    /// Application root override (defaults to the per-user data directory)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List installed versions
    List,
    /// List versions available for download
    Available {
        /// Query the release index even if the cached list is fresh
        #[arg(long)]
        refresh: bool,
    },
    /// Download and install a version
    Install {
        /// Release name, e.g. 4.2-stable
        name: String,
        /// Install the extended-runtime (C#/mono) build
        #[arg(long)]
        mono: bool,
    },
    /// Remove an installed version
    Uninstall { name: String },
    /// Launch an installed version (defaults to the selected one)
    Launch { name: Option<String> },
    /// Mark an installed version as the selected default
    Select { name: String },
}

/// Execute one command against the catalog rooted at `root`.
pub async fn run(cli: Cli, root: PathBuf) -> Result<(), LauncherError> {
    let mut catalog = Catalog::open(root)?;
    let client = ReleaseClient::new()?;
    let platform = Platform::detect()?;

    // At most one index query per staleness window; a failed query keeps
    // the cached list, so offline runs still work.
    catalog.refresh_available(&client, false).await?;

    match cli.command {
        Command::List => {
            for name in catalog.installed() {
                let marker = if name == catalog.selected() { "*" } else { " " };
                println!("{marker} {name}");
            }
        }
        Command::Available { refresh } => {
            if refresh {
                catalog.refresh_available(&client, true).await?;
            }
            for name in catalog.available() {
                let marker = if catalog.is_installed(name) { "i" } else { " " };
                println!("{marker} {name}");
            }
        }
        Command::Install { name, mono } => {
            let installer = Installer::new(client, platform);

            let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            let bars = tokio::spawn(drive_progress(rx));
            let result = installer.install(&mut catalog, &name, mono, tx).await;
            bars.await.ok();

            match result {
                Ok(display) => println!("installed {display} and selected it"),
                Err(e) => {
                    error!("install failed during {}: {e}", e.stage());
                    return Err(e);
                }
            }
        }
        Command::Uninstall { name } => {
            let installer = Installer::new(client, platform);
            installer.uninstall(&mut catalog, &name)?;
            println!("uninstalled {name}");
        }
        Command::Launch { name } => {
            let name = match name {
                Some(name) => name,
                None if !catalog.selected().is_empty() => catalog.selected().to_string(),
                None => {
                    return Err(LauncherError::NotFound(
                        "no version selected; install one first".to_string(),
                    ));
                }
            };
            launch::launch(&catalog, &name)?;
        }
        Command::Select { name } => {
            catalog.set_selected(&name)?;
            println!("selected {name}");
        }
    }

    Ok(())
}

/// Consume install events and render them as progress bars. The channel
/// keeps blocking I/O off this task; the worker never waits on the terminal.
async fn drive_progress(mut rx: mpsc::Receiver<InstallEvent>) {
    let bytes_style =
        ProgressStyle::with_template("[{bar:40.cyan/blue}] {bytes}/{total_bytes}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
    let files_style =
        ProgressStyle::with_template("[{bar:40.green/blue}] {pos}/{len} files  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");

    let mut bar: Option<ProgressBar> = None;
    while let Some(event) = rx.recv().await {
        match event {
            InstallEvent::DownloadProgress { bytes, total } => {
                let pb = bar.get_or_insert_with(|| {
                    let pb = ProgressBar::new(total);
                    pb.set_style(bytes_style.clone());
                    pb.set_message("downloading");
                    pb
                });
                if total > 0 {
                    pb.set_length(total);
                }
                pb.set_position(bytes);
            }
            InstallEvent::DownloadFinished => {
                if let Some(pb) = bar.take() {
                    let downloaded = format_bytes(pb.position());
                    pb.finish_with_message(format!("downloaded {downloaded}"));
                }
            }
            InstallEvent::ExtractProgress { files, total } => {
                let pb = bar.get_or_insert_with(|| {
                    let pb = ProgressBar::new(total as u64);
                    pb.set_style(files_style.clone());
                    pb.set_message("extracting");
                    pb
                });
                pb.set_length(total as u64);
                pb.set_position(files as u64);
            }
            InstallEvent::ExtractFinished => {
                if let Some(pb) = bar.take() {
                    pb.finish_with_message("extracted");
                }
            }
        }
    }
}
