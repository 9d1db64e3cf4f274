//! Godot engine version manager
//!
//! Discovers published releases, resolves the artifact matching the host
//! platform and build variant, downloads and extracts it atomically into a
//! per-version install tree, and keeps a durable catalog of what is
//! installed, what is available and which version is selected.

pub mod assets;
pub mod catalog;
pub mod cli;
pub mod download;
pub mod error;
pub mod extract;
pub mod installer;
pub mod launch;
pub mod platform;
pub mod progress;
pub mod releases;

pub use error::LauncherError;
