//! Archive extraction with atomic placement into the install tree
//!
//! Entries are unpacked into a temporary sibling of the final directory and
//! the sibling is renamed into place only after every entry succeeded. A
//! crash or failure mid-extraction therefore never leaves a half-installed
//! version that looks complete: the final directory either exists in full or
//! not at all.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::error::LauncherError;
use crate::progress::ProgressSender;

/// Extract `archive` into `final_dir`, emitting an extract-progress event
/// per entry. `final_dir` appears atomically on success; an existing install
/// at the same path is replaced only after extraction fully succeeded.
pub async fn install_archive(
    archive: &Path,
    final_dir: &Path,
    progress: Arc<ProgressSender>,
) -> Result<(), LauncherError> {
    let archive = archive.to_path_buf();
    let final_dir = final_dir.to_path_buf();

    // Zip decoding is CPU-bound; keep it off the async worker threads.
    tokio::task::spawn_blocking(move || extract_then_rename(&archive, &final_dir, &progress))
        .await
        .map_err(|e| LauncherError::Extract(format!("extraction task failed: {e}")))?
}

fn extract_then_rename(
    archive: &Path,
    final_dir: &Path,
    progress: &ProgressSender,
) -> Result<(), LauncherError> {
    let parent = final_dir
        .parent()
        .ok_or_else(|| LauncherError::Extract("install dir has no parent".to_string()))?;
    fs::create_dir_all(parent)?;

    // TempDir guard: dropped (and removed) on every early return below.
    let staging = tempfile::Builder::new()
        .prefix(".partial-")
        .tempdir_in(parent)
        .map_err(LauncherError::Io)?;

    extract_zip(archive, staging.path(), progress)?;

    if final_dir.exists() {
        fs::remove_dir_all(final_dir)?;
    }

    // Persist the staging dir, then a single rename makes the install visible.
    let staged = staging.keep();
    if let Err(e) = fs::rename(&staged, final_dir) {
        let _ = fs::remove_dir_all(&staged);
        return Err(LauncherError::Extract(format!(
            "could not move install into place: {e}"
        )));
    }

    info!("installed into {}", final_dir.display());
    progress.extract_finished();
    Ok(())
}

fn extract_zip(archive: &Path, dest: &Path, progress: &ProgressSender) -> Result<(), LauncherError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| LauncherError::Extract(format!("unreadable archive: {e}")))?;

    let total = zip.len();
    for i in 0..total {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| LauncherError::Extract(format!("bad archive entry {i}: {e}")))?;

        let Some(relative) = entry.enclosed_name() else {
            // Entry escapes the destination; never write it.
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(dir) = out_path.parent() {
                fs::create_dir_all(dir)?;
            }
            let mut out = File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out)
                .map_err(|e| LauncherError::Extract(format!("write failed for entry {i}: {e}")))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))?;
                }
            }
        }

        progress.extract_progress(i + 1, total);
    }

    Ok(())
}
