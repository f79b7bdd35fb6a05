//! Cross-platform store location discovery.
//!
//! Finds the desktop client's persistence-layer directories across Windows,
//! macOS, and Linux installations, including browser-profile variants. The
//! engine itself never opens these directories; discovery only hands paths
//! to the snapshot stage or to an external store reader.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

/// The client's leveldb directory name for the work/school origin.
const STORE_DIR: &str = "https_teams.microsoft.com_0.indexeddb.leveldb";
/// Alternate directory name for the consumer origin.
const STORE_DIR_LIVE: &str = "https_teams.live.com_0.indexeddb.leveldb";

/// A discovered store location. Lower priority numbers are preferred.
#[derive(Debug, Clone, Serialize)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub source: String,
    pub platform: String,
    pub priority: u8,
}

/// Discover all store locations present on this machine, sorted by
/// priority. An empty result is not an error; the caller decides whether
/// that is fatal.
pub fn discover() -> Vec<StoreLocation> {
    discover_on(std::env::consts::OS)
}

fn discover_on(os: &str) -> Vec<StoreLocation> {
    let mut locations = match os {
        "windows" => discover_windows(),
        "macos" => discover_macos(),
        "linux" => discover_linux(),
        other => {
            debug!(os = other, "no known store locations for this platform");
            Vec::new()
        }
    };
    locations.extend(discover_browsers(os));
    locations.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.path.cmp(&b.path)));
    locations
}

fn push_if_exists(out: &mut Vec<StoreLocation>, path: PathBuf, source: &str, platform: &str, priority: u8) {
    if path.is_dir() {
        out.push(StoreLocation {
            path,
            source: source.to_string(),
            platform: platform.to_string(),
            priority,
        });
    }
}

fn discover_windows() -> Vec<StoreLocation> {
    let mut out = Vec::new();
    let local = std::env::var_os("LOCALAPPDATA").map(PathBuf::from);
    let roaming = std::env::var_os("APPDATA").map(PathBuf::from);

    if let Some(roaming) = &roaming {
        push_if_exists(
            &mut out,
            roaming.join("Microsoft/Teams/IndexedDB").join(STORE_DIR),
            "Teams Classic 1.x",
            "Windows",
            2,
        );
    }
    if let Some(local) = &local {
        push_if_exists(
            &mut out,
            local
                .join("Packages/MSTeams_8wekyb3d8bbwe/LocalCache/Microsoft/MSTeams/EBWebView/WV2Profile_tfw/IndexedDB")
                .join(STORE_DIR),
            "Teams 2.x (Current)",
            "Windows",
            1,
        );
        push_if_exists(
            &mut out,
            local
                .join("Packages/MicrosoftTeams_8wekyb3d8bbwe/LocalCache/Microsoft/MSTeams/EBWebView/Default/IndexedDB")
                .join(STORE_DIR),
            "Teams 2.x (Early)",
            "Windows",
            3,
        );
    }
    out
}

fn discover_macos() -> Vec<StoreLocation> {
    let mut out = Vec::new();
    let Some(home) = dirs::home_dir() else {
        return out;
    };

    push_if_exists(
        &mut out,
        home.join("Library/Application Support/Microsoft/Teams/IndexedDB")
            .join(STORE_DIR),
        "Teams Classic",
        "macOS",
        1,
    );
    push_if_exists(
        &mut out,
        home.join("Library/Containers/com.microsoft.teams2/Data/Library/Application Support/Microsoft/Teams/IndexedDB")
            .join(STORE_DIR),
        "Teams 2.x Container",
        "macOS",
        2,
    );
    push_if_exists(
        &mut out,
        home.join("Library/Group Containers/UBF8T346G9.com.microsoft.teams/Library/Application Support/Microsoft/Teams/IndexedDB")
            .join(STORE_DIR),
        "Teams 2.x Group Container",
        "macOS",
        3,
    );
    out
}

fn discover_linux() -> Vec<StoreLocation> {
    let mut out = Vec::new();
    let Some(home) = dirs::home_dir() else {
        return out;
    };

    push_if_exists(
        &mut out,
        home.join(".config/Microsoft/Microsoft Teams/IndexedDB")
            .join(STORE_DIR),
        "Teams Native Classic",
        "Linux",
        1,
    );
    push_if_exists(
        &mut out,
        home.join("snap/teams-for-linux/current/.config/teams-for-linux")
            .join(STORE_DIR),
        "teams-for-linux (Snap)",
        "Linux",
        2,
    );
    push_if_exists(
        &mut out,
        home.join("snap/teams-for-linux/current/.config/teams-for-linux")
            .join(STORE_DIR_LIVE),
        "teams-for-linux Live (Snap)",
        "Linux",
        3,
    );
    out
}

fn discover_browsers(os: &str) -> Vec<StoreLocation> {
    let mut out = Vec::new();
    let Some(home) = dirs::home_dir() else {
        return out;
    };

    match os {
        "windows" => {
            if let Some(local) = std::env::var_os("LOCALAPPDATA").map(PathBuf::from) {
                push_if_exists(
                    &mut out,
                    local.join("Google/Chrome/User Data/Default/Storage/leveldb"),
                    "Chrome (Browser)",
                    "Windows",
                    10,
                );
                push_if_exists(
                    &mut out,
                    local.join("Microsoft/Edge/User Data/Default/Storage/leveldb"),
                    "Edge (Browser)",
                    "Windows",
                    10,
                );
            }
            if let Some(roaming) = std::env::var_os("APPDATA").map(PathBuf::from) {
                out.extend(discover_firefox_profiles(
                    &roaming.join("Mozilla/Firefox/Profiles"),
                    "Windows",
                ));
            }
        }
        "macos" => {
            push_if_exists(
                &mut out,
                home.join("Library/Application Support/Google/Chrome/Default/Storage/leveldb"),
                "Chrome (Browser)",
                "macOS",
                10,
            );
            push_if_exists(
                &mut out,
                home.join("Library/Application Support/Microsoft Edge/Default/Storage/leveldb"),
                "Edge (Browser)",
                "macOS",
                10,
            );
        }
        "linux" => {
            push_if_exists(
                &mut out,
                home.join(".config/google-chrome/Default/Storage/leveldb"),
                "Chrome (Browser)",
                "Linux",
                10,
            );
        }
        _ => {}
    }
    out
}

/// Firefox keeps per-profile storage; every profile with the client's idb
/// directory is a candidate.
fn discover_firefox_profiles(profiles_dir: &Path, platform: &str) -> Vec<StoreLocation> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(profiles_dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let profile = entry.path();
        if !profile.is_dir() {
            continue;
        }
        let storage = profile.join("storage/default/https+++teams.microsoft.com/idb");
        if storage.is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            out.push(StoreLocation {
                path: storage,
                source: format!("Firefox - {}", name),
                platform: platform.to_string(),
                priority: 11,
            });
        }
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

/// Check that a location looks like a readable leveldb store: a `CURRENT`
/// pointer or at least one `MANIFEST-*` file.
pub fn validate(location: &StoreLocation) -> bool {
    let Ok(entries) = std::fs::read_dir(&location.path) else {
        return false;
    };
    let mut has_manifest = false;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == "CURRENT" {
            return true;
        }
        if name.starts_with("MANIFEST-") {
            has_manifest = true;
        }
    }
    has_manifest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(path: PathBuf) -> StoreLocation {
        StoreLocation {
            path,
            source: "test".to_string(),
            platform: "test".to_string(),
            priority: 1,
        }
    }

    #[test]
    fn test_validate_requires_manifest_files() {
        let tmp = tempfile::tempdir().unwrap();
        let loc = location(tmp.path().to_path_buf());
        assert!(!validate(&loc));

        std::fs::write(tmp.path().join("MANIFEST-000001"), b"").unwrap();
        assert!(validate(&loc));

        std::fs::write(tmp.path().join("CURRENT"), b"MANIFEST-000001\n").unwrap();
        assert!(validate(&loc));
    }

    #[test]
    fn test_validate_missing_dir() {
        let loc = location(PathBuf::from("/definitely/not/here"));
        assert!(!validate(&loc));
    }

    #[test]
    fn test_firefox_profile_scan() {
        let tmp = tempfile::tempdir().unwrap();
        let idb = tmp
            .path()
            .join("abcd1234.default/storage/default/https+++teams.microsoft.com/idb");
        std::fs::create_dir_all(&idb).unwrap();
        std::fs::create_dir_all(tmp.path().join("empty-profile")).unwrap();

        let found = discover_firefox_profiles(tmp.path(), "test");
        assert_eq!(found.len(), 1);
        assert!(found[0].source.contains("abcd1234.default"));
        assert_eq!(found[0].priority, 11);
    }

    #[test]
    fn test_unknown_platform_is_empty() {
        assert!(discover_on("plan9").is_empty());
    }
}
