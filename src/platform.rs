//! Host platform detection for asset selection

use once_cell::sync::OnceCell;

use crate::error::LauncherError;

/// Operating system family of a supported host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Linux,
    MacOs,
}

impl OsFamily {
    /// Tag the upstream project embeds in asset filenames for this OS.
    pub fn asset_tag(&self) -> &'static str {
        match self {
            OsFamily::Windows => "win",
            OsFamily::Linux => "linux",
            OsFamily::MacOs => "macos",
        }
    }
}

/// Pointer width of the host, as spelled inside asset filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bits {
    Bits32,
    Bits64,
}

impl Bits {
    pub fn asset_tag(&self) -> &'static str {
        match self {
            Bits::Bits32 => "32",
            Bits::Bits64 => "64",
        }
    }
}

/// Host descriptor, derived once at startup and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: OsFamily,
    pub bits: Bits,
}

/// Global cache for platform detection (initialized once, used everywhere)
static PLATFORM_CACHE: OnceCell<Platform> = OnceCell::new();

impl Platform {
    /// Detect the running platform (cached after first call).
    ///
    /// An unsupported OS is a fatal startup condition; callers in `main`
    /// exit on it rather than recovering.
    pub fn detect() -> Result<Self, LauncherError> {
        PLATFORM_CACHE
            .get_or_try_init(|| {
                Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
            })
            .copied()
    }

    fn from_parts(os: &str, arch: &str) -> Result<Self, LauncherError> {
        let os = match os {
            "windows" => OsFamily::Windows,
            "linux" => OsFamily::Linux,
            "macos" => OsFamily::MacOs,
            other => return Err(LauncherError::UnsupportedPlatform(other.to_string())),
        };
        let bits = if arch.ends_with("64") {
            Bits::Bits64
        } else {
            Bits::Bits32
        };
        Ok(Platform { os, bits })
    }
}
