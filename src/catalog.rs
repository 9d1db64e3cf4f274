//! Durable catalog of installed versions, available versions and selection
//!
//! The catalog file holds three tables: `InstalledVersions` (display name to
//! install path), `AvailableVersions` (release name to reference URL) and
//! `Config` (`last_run`, `selected_version`, `latest_installed_version`). It
//! is read fully at startup and rewritten wholesale after every mutation;
//! one `Catalog` value owns the file for the lifetime of the process.
//!
//! The installed set is authoritative-by-rescan: uninstalling deletes a
//! directory and re-scans the two variant subtrees, it never hand-edits the
//! map.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDateTime};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::LauncherError;
use crate::releases::ReleaseSource;

/// Timestamp format of `last_run`.
pub const TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Display-name suffix that keeps extended builds in their own namespace.
pub const MONO_SUFFIX: &str = " (mono)";

const CATALOG_FILE: &str = "catalog.toml";
const STANDARD_DIR: &str = "versions";
const MONO_DIR: &str = "mono";

/// How long an available-versions snapshot stays fresh, in days.
const STALE_AFTER_DAYS: i64 = 1;

/// Dotted numeric version prefix of a display name, e.g. `4.2` in
/// `4.2-stable (mono)`.
static VERSION_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+(?:\.\d+)?").expect("valid version regex"));

#[derive(Debug, Serialize, Deserialize)]
struct CatalogState {
    #[serde(rename = "InstalledVersions")]
    installed: BTreeMap<String, PathBuf>,
    #[serde(rename = "AvailableVersions")]
    available: BTreeMap<String, String>,
    #[serde(rename = "Config")]
    config: ConfigTable,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigTable {
    last_run: String,
    selected_version: String,
    latest_installed_version: String,
}

impl CatalogState {
    fn empty() -> Self {
        Self {
            installed: BTreeMap::new(),
            available: BTreeMap::new(),
            config: ConfigTable {
                last_run: String::new(),
                selected_version: String::new(),
                latest_installed_version: String::new(),
            },
        }
    }
}

/// Owner of the durable catalog state. All reads and writes go through one
/// instance; mutations persist the whole file before returning.
#[derive(Debug)]
pub struct Catalog {
    root: PathBuf,
    file: PathBuf,
    state: CatalogState,
}

impl Catalog {
    /// Per-user application root (`<data dir>/godot-launcher`).
    pub fn default_root() -> Result<PathBuf, LauncherError> {
        dirs::data_dir()
            .map(|p| p.join("godot-launcher"))
            .ok_or_else(|| {
                LauncherError::Io(std::io::Error::other("no user data directory available"))
            })
    }

    /// Open the catalog under `root`, creating the directory tree and an
    /// initial catalog file on first run.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, LauncherError> {
        let root = root.into();
        fs::create_dir_all(root.join(STANDARD_DIR))?;
        fs::create_dir_all(root.join(MONO_DIR))?;

        let file = root.join(CATALOG_FILE);
        if file.exists() {
            let text = fs::read_to_string(&file)?;
            let state: CatalogState = toml::from_str(&text)
                .map_err(|e| LauncherError::CorruptCatalog(e.to_string()))?;
            Ok(Self { root, file, state })
        } else {
            let mut catalog = Self {
                root,
                file,
                state: CatalogState::empty(),
            };
            // Picks up installs left behind by a previous tree and persists
            catalog.refresh_installed()?;
            info!("created initial catalog at {}", catalog.file.display());
            Ok(catalog)
        }
    }

    pub fn installed(&self) -> Vec<&str> {
        self.state.installed.keys().map(String::as_str).collect()
    }

    pub fn available(&self) -> Vec<&str> {
        self.state.available.keys().map(String::as_str).collect()
    }

    pub fn selected(&self) -> &str {
        &self.state.config.selected_version
    }

    pub fn latest_installed(&self) -> &str {
        &self.state.config.latest_installed_version
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.state.installed.contains_key(name)
    }

    /// Install directory of an installed version, by display name.
    pub fn install_path(&self, name: &str) -> Result<&Path, LauncherError> {
        self.state
            .installed
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| LauncherError::NotFound(name.to_string()))
    }

    /// Release reference URL of an available version, by release name.
    pub fn release_reference(&self, name: &str) -> Result<&str, LauncherError> {
        self.state
            .available
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| LauncherError::NotFound(name.to_string()))
    }

    /// Where a release installs to, partitioned by variant.
    pub fn install_dir(&self, release: &str, mono: bool) -> PathBuf {
        let base = if mono { MONO_DIR } else { STANDARD_DIR };
        self.root.join(base).join(release)
    }

    /// Catalog entry name for a release/variant pair. Standard and mono
    /// builds of the same release coexist as distinct entries.
    pub fn display_name(release: &str, mono: bool) -> String {
        if mono {
            format!("{release}{MONO_SUFFIX}")
        } else {
            release.to_string()
        }
    }

    /// Change the selection. Fails with `NotFound` (selection untouched)
    /// when `name` is not installed.
    pub fn set_selected(&mut self, name: &str) -> Result<(), LauncherError> {
        if !self.is_installed(name) {
            return Err(LauncherError::NotFound(name.to_string()));
        }
        self.state.config.selected_version = name.to_string();
        self.persist()
    }

    /// Rescan the two variant subtrees and rebuild the installed set,
    /// recompute the latest installed version and heal the selection if it
    /// no longer names an installed entry.
    pub fn refresh_installed(&mut self) -> Result<(), LauncherError> {
        let mut installed = BTreeMap::new();
        scan_versions(&self.root.join(STANDARD_DIR), "", &mut installed)?;
        scan_versions(&self.root.join(MONO_DIR), MONO_SUFFIX, &mut installed)?;

        let latest = latest_version(installed.keys());
        self.state.installed = installed;
        self.state.config.latest_installed_version = latest.clone();

        let selected = &self.state.config.selected_version;
        if selected.is_empty() || !self.state.installed.contains_key(selected) {
            self.state.config.selected_version = latest;
        }
        self.persist()
    }

    /// Refresh the available-versions snapshot from `source`.
    ///
    /// Queries only when forced, when the last successful refresh is older
    /// than a day, or when the snapshot is empty. A failed query is logged
    /// and keeps the previous snapshot. Returns whether a query was made.
    pub async fn refresh_available<S: ReleaseSource>(
        &mut self,
        source: &S,
        force: bool,
    ) -> Result<bool, LauncherError> {
        if !force && !self.snapshot_stale() && !self.state.available.is_empty() {
            return Ok(false);
        }

        match source.releases().await {
            Ok(releases) if !releases.is_empty() => {
                self.state.available = releases
                    .into_iter()
                    .map(|r| (r.name, r.url))
                    .collect();
                self.state.config.last_run = Local::now().naive_local().format(TIME_FORMAT).to_string();
                self.persist()?;
                info!("release list refreshed: {} versions", self.state.available.len());
            }
            Ok(_) => warn!("release index returned no releases, keeping previous list"),
            Err(e) => warn!("release refresh failed, keeping previous list: {e}"),
        }
        Ok(true)
    }

    fn snapshot_stale(&self) -> bool {
        match NaiveDateTime::parse_from_str(&self.state.config.last_run, TIME_FORMAT) {
            Ok(last) => {
                (Local::now().naive_local() - last).abs() > Duration::days(STALE_AFTER_DAYS)
            }
            // Never refreshed, or an unreadable stamp
            Err(_) => true,
        }
    }

    fn persist(&self) -> Result<(), LauncherError> {
        let text = toml::to_string_pretty(&self.state)
            .map_err(|e| LauncherError::Io(std::io::Error::other(e)))?;
        fs::write(&self.file, text)?;
        Ok(())
    }
}

fn scan_versions(
    dir: &Path,
    suffix: &str,
    into: &mut BTreeMap<String, PathBuf>,
) -> Result<(), LauncherError> {
    // Recreate a subtree someone deleted out from under us
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            into.insert(format!("{name}{suffix}"), entry.path());
        }
    }
    Ok(())
}

/// Maximum display name by component-wise numeric comparison of the dotted
/// version prefix. Unparsable names are skipped; ties keep the first name in
/// iteration order. Empty when nothing parses.
fn latest_version<'a>(names: impl Iterator<Item = &'a String>) -> String {
    let mut best: Option<(Vec<u64>, &str)> = None;
    for name in names {
        let Some(m) = VERSION_PREFIX.find(name) else {
            continue;
        };
        let parts: Vec<u64> = m
            .as_str()
            .split('.')
            .map(|p| p.parse().unwrap_or(0))
            .collect();
        match &best {
            Some((current, _)) if parts <= *current => {}
            _ => best = Some((parts, name)),
        }
    }
    best.map(|(_, name)| name.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::releases::Release;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FakeIndex {
        calls: AtomicUsize,
        releases: Vec<Release>,
        fail: bool,
    }

    impl FakeIndex {
        fn with(releases: &[(&str, &str)]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                releases: releases
                    .iter()
                    .map(|(n, u)| Release {
                        name: n.to_string(),
                        url: u.to_string(),
                    })
                    .collect(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                releases: Vec::new(),
                fail: true,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ReleaseSource for FakeIndex {
        async fn releases(&self) -> Result<Vec<Release>, LauncherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(LauncherError::Network("index unreachable".to_string()))
            } else {
                Ok(self.releases.clone())
            }
        }
    }

    fn open_catalog(root: &TempDir) -> Catalog {
        Catalog::open(root.path()).unwrap()
    }

    fn add_install(root: &TempDir, subtree: &str, name: &str) {
        fs::create_dir_all(root.path().join(subtree).join(name)).unwrap();
    }

    #[test]
    fn first_open_bootstraps_tree_and_file() {
        let root = TempDir::new().unwrap();
        let catalog = open_catalog(&root);
        assert!(root.path().join("versions").is_dir());
        assert!(root.path().join("mono").is_dir());
        assert!(root.path().join("catalog.toml").is_file());
        assert!(catalog.installed().is_empty());
        assert_eq!(catalog.selected(), "");
        assert_eq!(catalog.latest_installed(), "");
    }

    #[test]
    fn rescan_partitions_variants_into_distinct_names() {
        let root = TempDir::new().unwrap();
        add_install(&root, "versions", "4.2-stable");
        add_install(&root, "mono", "4.2-stable");

        let mut catalog = open_catalog(&root);
        catalog.refresh_installed().unwrap();

        assert!(catalog.is_installed("4.2-stable"));
        assert!(catalog.is_installed("4.2-stable (mono)"));
        assert_eq!(catalog.installed().len(), 2);
        assert!(
            catalog
                .install_path("4.2-stable (mono)")
                .unwrap()
                .starts_with(root.path().join("mono"))
        );
    }

    #[test]
    fn rescan_is_idempotent() {
        let root = TempDir::new().unwrap();
        add_install(&root, "versions", "3.5-stable");
        add_install(&root, "versions", "4.0-stable");

        let mut catalog = open_catalog(&root);
        catalog.refresh_installed().unwrap();
        let first: Vec<String> = catalog.installed().iter().map(|s| s.to_string()).collect();
        let first_latest = catalog.latest_installed().to_string();

        catalog.refresh_installed().unwrap();
        let second: Vec<String> = catalog.installed().iter().map(|s| s.to_string()).collect();

        assert_eq!(first, second);
        assert_eq!(first_latest, catalog.latest_installed());
    }

    #[test]
    fn latest_is_numeric_not_lexicographic() {
        let names: Vec<String> = ["3.5", "4.0", "4.2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(latest_version(names.iter()), "4.2");

        let names: Vec<String> = ["9.0", "10.1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(latest_version(names.iter()), "10.1");

        let names: Vec<String> = ["4.1.1", "4.1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(latest_version(names.iter()), "4.1.1");

        assert_eq!(latest_version(std::iter::empty()), "");

        let names: Vec<String> = ["nightly"].iter().map(|s| s.to_string()).collect();
        assert_eq!(latest_version(names.iter()), "");
    }

    #[test]
    fn latest_tie_prefers_the_standard_build() {
        let names: Vec<String> = ["4.2-stable", "4.2-stable (mono)"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(latest_version(names.iter()), "4.2-stable");
    }

    #[test]
    fn selecting_an_uninstalled_version_leaves_selection_unchanged() {
        let root = TempDir::new().unwrap();
        add_install(&root, "versions", "4.2-stable");
        let mut catalog = open_catalog(&root);
        catalog.refresh_installed().unwrap();
        assert_eq!(catalog.selected(), "4.2-stable");

        let err = catalog.set_selected("5.0-stable").unwrap_err();
        assert!(matches!(err, LauncherError::NotFound(_)));
        assert_eq!(catalog.selected(), "4.2-stable");
    }

    #[test]
    fn dangling_selection_heals_on_rescan() {
        let root = TempDir::new().unwrap();
        add_install(&root, "versions", "4.0-stable");
        add_install(&root, "versions", "4.2-stable");
        let mut catalog = open_catalog(&root);
        catalog.refresh_installed().unwrap();
        catalog.set_selected("4.2-stable").unwrap();

        // Uninstall is delete + full rescan, never a map edit
        fs::remove_dir_all(root.path().join("versions").join("4.2-stable")).unwrap();
        catalog.refresh_installed().unwrap();

        assert_eq!(catalog.selected(), "4.0-stable");
        assert_eq!(catalog.latest_installed(), "4.0-stable");
    }

    #[test]
    fn state_survives_reopen() {
        let root = TempDir::new().unwrap();
        add_install(&root, "versions", "4.2-stable");
        {
            let mut catalog = open_catalog(&root);
            catalog.refresh_installed().unwrap();
            catalog.set_selected("4.2-stable").unwrap();
        }
        let catalog = open_catalog(&root);
        assert!(catalog.is_installed("4.2-stable"));
        assert_eq!(catalog.selected(), "4.2-stable");
    }

    #[test]
    fn corrupt_catalog_file_is_reported_as_such() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("catalog.toml"), "[Config]\nnot_the_schema = 1\n").unwrap();
        let err = Catalog::open(root.path()).unwrap_err();
        assert!(matches!(err, LauncherError::CorruptCatalog(_)));
    }

    #[tokio::test]
    async fn available_refresh_is_staleness_gated() {
        let root = TempDir::new().unwrap();
        let mut catalog = open_catalog(&root);
        let index = FakeIndex::with(&[("4.2-stable", "https://api.example/1")]);

        // Empty snapshot: first call queries
        assert!(catalog.refresh_available(&index, false).await.unwrap());
        assert_eq!(index.call_count(), 1);
        assert_eq!(catalog.available(), vec!["4.2-stable"]);

        // Within the staleness window: no second query
        assert!(!catalog.refresh_available(&index, false).await.unwrap());
        assert_eq!(index.call_count(), 1);

        // Force bypasses the gate
        assert!(catalog.refresh_available(&index, true).await.unwrap());
        assert_eq!(index.call_count(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_previous_snapshot() {
        let root = TempDir::new().unwrap();
        let mut catalog = open_catalog(&root);
        let good = FakeIndex::with(&[("4.2-stable", "https://api.example/1")]);
        catalog.refresh_available(&good, true).await.unwrap();
        assert_eq!(catalog.available(), vec!["4.2-stable"]);

        let bad = FakeIndex::failing();
        catalog.refresh_available(&bad, true).await.unwrap();
        assert_eq!(bad.call_count(), 1);
        assert_eq!(catalog.available(), vec!["4.2-stable"]);

        // The failure did not refresh the stamp, so the next gate retries
        let good_again = FakeIndex::with(&[("4.3-stable", "https://api.example/2")]);
        catalog.refresh_available(&good_again, true).await.unwrap();
        assert_eq!(catalog.available(), vec!["4.3-stable"]);
    }

    #[test]
    fn release_reference_resolves_from_the_available_table() {
        let root = TempDir::new().unwrap();
        let mut catalog = open_catalog(&root);
        catalog.state.available.insert(
            "4.2-stable".to_string(),
            "https://api.example/1".to_string(),
        );
        assert_eq!(
            catalog.release_reference("4.2-stable").unwrap(),
            "https://api.example/1"
        );
        assert!(matches!(
            catalog.release_reference("nope"),
            Err(LauncherError::NotFound(_))
        ));
    }
}
