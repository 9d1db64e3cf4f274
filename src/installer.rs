//! Install orchestration: resolve, download, extract, record
//!
//! One install runs at a time: Idle -> Downloading -> Extracting ->
//! Updating-Catalog -> Done, failing over to a terminal error from any step.
//! The temp working area is a `TempDir` guard, so its removal is guaranteed
//! on every exit path, success and failure alike.

use std::sync::Arc;

use log::{error, info};
use tokio::sync::mpsc;

use crate::assets;
use crate::catalog::Catalog;
use crate::error::LauncherError;
use crate::extract;
use crate::platform::Platform;
use crate::progress::{InstallEvent, ProgressSender};
use crate::releases::AssetSource;

/// Drives the install pipeline against one catalog.
pub struct Installer<S> {
    source: S,
    platform: Platform,
}

impl<S: AssetSource> Installer<S> {
    pub fn new(source: S, platform: Platform) -> Self {
        Self { source, platform }
    }

    /// Install `release` (by release name) for the host platform.
    ///
    /// On success the catalog has been rescanned and the selection moved to
    /// the new install; the returned string is its display name. On failure
    /// the install tree is untouched and the temp area removed.
    pub async fn install(
        &self,
        catalog: &mut Catalog,
        release: &str,
        mono: bool,
        events: mpsc::Sender<InstallEvent>,
    ) -> Result<String, LauncherError> {
        let reference = catalog.release_reference(release)?.to_string();
        let asset_listing = self.source.asset_listing(&reference).await?;
        let url = assets::select_asset(&asset_listing, self.platform, mono)?.to_string();

        // Working area lives exactly as long as this call
        let workdir = tempfile::tempdir()?;
        let archive = tempfile::Builder::new()
            .prefix("godot-")
            .suffix(assets::ARCHIVE_EXT)
            .tempfile_in(workdir.path())?
            .into_temp_path();

        let progress = Arc::new(ProgressSender::new(events));
        self.source.fetch_asset(&url, &archive, &progress).await?;

        let final_dir = catalog.install_dir(release, mono);
        extract::install_archive(&archive, &final_dir, Arc::clone(&progress)).await?;

        catalog.refresh_installed()?;
        let display = Catalog::display_name(release, mono);
        catalog.set_selected(&display)?;

        info!("installed {display}");
        Ok(display)
    }

    /// Remove an installed version and re-synchronize the catalog by
    /// rescanning the install tree (delete + full rescan, not a map edit).
    pub fn uninstall(&self, catalog: &mut Catalog, name: &str) -> Result<(), LauncherError> {
        let path = catalog.install_path(name)?.to_path_buf();
        if let Err(e) = std::fs::remove_dir_all(&path) {
            error!("could not remove {}: {e}", path.display());
            return Err(LauncherError::Io(e));
        }
        catalog.refresh_installed()?;
        info!("uninstalled {name}");
        Ok(())
    }
}
