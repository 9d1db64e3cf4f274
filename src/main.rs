//! godot-launcher binary entry point
//!
//! Thin wrapper around the library: logging setup, the fatal platform
//! check, and command dispatch live here.

use std::io::Write;

use anyhow::Result;
use clap::Parser;

use godot_launcher::catalog::Catalog;
use godot_launcher::cli::Cli;
use godot_launcher::platform::Platform;

/// Duplicates log output to the launcher log file and stderr.
struct Tee {
    file: std::fs::File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = std::io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = std::io::stderr().flush();
        self.file.flush()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = match &cli.root {
        Some(root) => root.clone(),
        None => Catalog::default_root()?,
    };
    std::fs::create_dir_all(&root)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(root.join("launcher.log"))?;
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Pipe(Box::new(Tee { file: log_file })))
        .init();

    // The one fatal condition: a host we have no builds for
    let platform = Platform::detect()?;
    log::info!(
        "godot-launcher {} on {:?} ({}-bit)",
        env!("CARGO_PKG_VERSION"),
        platform.os,
        platform.bits.asset_tag()
    );

    Ok(godot_launcher::cli::run(cli, root).await?)
}
