//! Release asset selection for the host platform and build variant
//!
//! Upstream asset names follow `Godot_v<version>-stable_<tags>.zip`, where
//! the tags after the stability marker encode the build variant and the
//! platform/bitness (`win64`, `mono_linux_x86_64`, ...). The matcher works on
//! a structured view of that name instead of nested string slicing.

use std::collections::BTreeMap;

use crate::error::LauncherError;
use crate::platform::Platform;

/// Only archives are install candidates.
pub const ARCHIVE_EXT: &str = ".zip";

/// Marker separating the version prefix from the variant/platform tags.
const STABILITY_MARKER: &str = "stable";

/// Variant tag of the extended-runtime (C#) build.
const MONO_TAG: &str = "mono";

/// Structured view of one candidate asset filename.
#[derive(Debug)]
struct AssetName<'a> {
    /// Everything after the stability marker, e.g. `_mono_win64.zip`
    remainder: &'a str,
    /// First `_`-separated segment of the remainder, e.g. `mono` or `win64.exe.zip`
    variant_tag: &'a str,
}

impl<'a> AssetName<'a> {
    /// Parse a filename into its tag view; `None` when it is not an archive
    /// or lacks the stability marker.
    fn parse(filename: &'a str) -> Option<Self> {
        if !filename.ends_with(ARCHIVE_EXT) {
            return None;
        }
        let marker = filename.find(STABILITY_MARKER)?;
        let remainder = &filename[marker + STABILITY_MARKER.len()..];
        let variant_tag = remainder.split('_').nth(1).unwrap_or("");
        Some(Self {
            remainder,
            variant_tag,
        })
    }

    fn matches(&self, platform: Platform, mono: bool) -> bool {
        let os_tag = platform.os.asset_tag();
        let bits = platform.bits.asset_tag();
        if mono {
            // Extended builds must carry the explicit mono tag and the
            // concatenated platform+bitness token.
            self.variant_tag == MONO_TAG && self.remainder.contains(&format!("{os_tag}{bits}"))
        } else {
            !os_tag.is_empty() && self.remainder.contains(bits) && !self.remainder.contains(MONO_TAG)
        }
    }
}

/// Select the download URL for the host platform and variant.
///
/// Candidates are visited in lexicographic filename order so the result is
/// deterministic when more than one asset satisfies the predicate; the first
/// qualifying candidate wins.
pub fn select_asset<'a>(
    assets: &'a BTreeMap<String, String>,
    platform: Platform,
    mono: bool,
) -> Result<&'a str, LauncherError> {
    for (filename, url) in assets {
        if let Some(name) = AssetName::parse(filename)
            && name.matches(platform, mono)
        {
            return Ok(url);
        }
    }
    Err(LauncherError::MatchNotFound(format!(
        "no {} asset for {}{}-bit among {} files",
        if mono { "mono" } else { "standard" },
        platform.os.asset_tag(),
        platform.bits.asset_tag(),
        assets.len()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Bits, OsFamily};

    fn win64() -> Platform {
        Platform {
            os: OsFamily::Windows,
            bits: Bits::Bits64,
        }
    }

    fn linux64() -> Platform {
        Platform {
            os: OsFamily::Linux,
            bits: Bits::Bits64,
        }
    }

    fn assets(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn standard_and_mono_variants_resolve_for_win64() {
        let assets = assets(&[
            ("Godot_v4.2-stable_win64.exe.zip", "U1"),
            ("Godot_v4.2-stable_mono_win64.zip", "U2"),
        ]);

        assert_eq!(select_asset(&assets, win64(), false).unwrap(), "U1");
        assert_eq!(select_asset(&assets, win64(), true).unwrap(), "U2");
    }

    #[test]
    fn non_archives_are_ignored() {
        let assets = assets(&[
            ("Godot_v4.2-stable_win64.exe", "raw"),
            ("Godot_v4.2-stable_win64.exe.zip.sha256", "sum"),
        ]);
        assert!(matches!(
            select_asset(&assets, win64(), false),
            Err(LauncherError::MatchNotFound(_))
        ));
    }

    #[test]
    fn mono_requires_explicit_tag() {
        let assets = assets(&[("Godot_v4.2-stable_win64.exe.zip", "U1")]);
        assert!(select_asset(&assets, win64(), true).is_err());
    }

    #[test]
    fn standard_rejects_mono_assets() {
        let assets = assets(&[("Godot_v4.2-stable_mono_win64.zip", "U2")]);
        assert!(select_asset(&assets, win64(), false).is_err());
    }

    #[test]
    fn linux_mono_uses_concatenated_platform_tag() {
        let assets = assets(&[
            ("Godot_v3.5-stable_mono_linux64.zip", "L2"),
            ("Godot_v3.5-stable_linux64.zip", "L1"),
        ]);
        assert_eq!(select_asset(&assets, linux64(), true).unwrap(), "L2");
        assert_eq!(select_asset(&assets, linux64(), false).unwrap(), "L1");
    }

    #[test]
    fn ambiguous_candidates_resolve_lexicographically() {
        // Both qualify for standard win64; "Godot_a..." sorts first.
        let assets = assets(&[
            ("Godot_b_v4.2-stable_win64.zip", "SECOND"),
            ("Godot_a_v4.2-stable_win64.zip", "FIRST"),
        ]);
        assert_eq!(select_asset(&assets, win64(), false).unwrap(), "FIRST");
    }

    #[test]
    fn empty_asset_set_reports_no_match() {
        let assets = BTreeMap::new();
        let err = select_asset(&assets, win64(), false).unwrap_err();
        assert!(matches!(err, LauncherError::MatchNotFound(_)));
    }

    #[test]
    fn thirty_two_bit_hosts_match_their_own_assets() {
        let win32 = Platform {
            os: OsFamily::Windows,
            bits: Bits::Bits32,
        };
        let assets = assets(&[("Godot_v3.5-stable_win32.zip", "W32")]);
        assert_eq!(select_asset(&assets, win32, false).unwrap(), "W32");
    }
}
