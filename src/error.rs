//! Error types for the launcher library

use thiserror::Error;

/// All failure modes of the install pipeline and catalog.
///
/// Only `UnsupportedPlatform` is fatal (raised once at startup); everything
/// else is reported to the user and the application stays usable.
#[derive(Error, Debug)]
pub enum LauncherError {
    /// Release index or asset listing could not be reached
    #[error("network error: {0}")]
    Network(String),

    /// Release index responded with something we cannot parse
    #[error("unexpected release index response: {0}")]
    Api(String),

    /// No release asset fits the host platform/variant
    #[error("no compatible build: {0}")]
    MatchNotFound(String),

    /// Transport or write failure while streaming an asset to disk
    #[error("download failed: {0}")]
    Download(String),

    /// Corrupt archive or filesystem failure during extraction
    #[error("extraction failed: {0}")]
    Extract(String),

    /// A version name that is not in the catalog
    #[error("unknown version: {0}")]
    NotFound(String),

    /// Host OS the launcher cannot manage builds for
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Catalog file exists but is missing required tables or keys
    #[error("catalog file is corrupt: {0}")]
    CorruptCatalog(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LauncherError {
    /// Pipeline stage name for user-facing failure messages.
    pub fn stage(&self) -> &'static str {
        match self {
            LauncherError::Network(_) | LauncherError::Api(_) => "release lookup",
            LauncherError::MatchNotFound(_) => "asset resolution",
            LauncherError::Download(_) => "download",
            LauncherError::Extract(_) => "extraction",
            LauncherError::NotFound(_)
            | LauncherError::CorruptCatalog(_)
            | LauncherError::Io(_) => "catalog update",
            LauncherError::UnsupportedPlatform(_) => "startup",
        }
    }
}
