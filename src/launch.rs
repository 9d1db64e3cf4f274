//! Launching an installed engine build

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;

use crate::catalog::Catalog;
use crate::error::LauncherError;

/// Spawn the engine binary of an installed version, detached from the
/// launcher process. `name` is the catalog display name.
pub fn launch(catalog: &Catalog, name: &str) -> Result<(), LauncherError> {
    let dir = catalog.install_path(name)?;
    let executable = find_executable(dir).ok_or_else(|| {
        LauncherError::NotFound(format!("no engine executable under {}", dir.display()))
    })?;

    info!("launching {}", executable.display());
    spawn_detached(&executable)?;
    Ok(())
}

#[cfg(windows)]
fn spawn_detached(executable: &Path) -> std::io::Result<()> {
    use std::os::windows::process::CommandExt;
    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
    Command::new(executable)
        .creation_flags(CREATE_NEW_CONSOLE)
        .spawn()
        .map(|_| ())
}

#[cfg(not(windows))]
fn spawn_detached(executable: &Path) -> std::io::Result<()> {
    Command::new(executable).spawn().map(|_| ())
}

/// Locate the engine binary inside an install directory.
///
/// Upstream zips nest the binary one level down. On Windows the build ships
/// two executables and the console one is the launch target; elsewhere the
/// binary is the first regular file with the executable bit set.
fn find_executable(dir: &Path) -> Option<PathBuf> {
    let mut entries: Vec<_> = fs::read_dir(dir).ok()?.flatten().collect();
    entries.sort_by_key(|e| e.file_name());

    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if is_engine_binary(&path) {
            return Some(path);
        }
    }
    subdirs.iter().find_map(|sub| find_executable(sub))
}

#[cfg(windows)]
fn is_engine_binary(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_lowercase();
    name.ends_with(".exe") && name.contains("console")
}

#[cfg(not(windows))]
fn is_engine_binary(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
