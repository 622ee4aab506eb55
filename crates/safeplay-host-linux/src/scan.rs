//! /proc scanning and game identity derivation
//!
//! A process is a game candidate when its executable path contains one of
//! the configured library markers (for Steam, "steamapps/common"). Its
//! identity is the install folder directly under the marker, so helper
//! binaries launched from the same install collapse to one identity. A
//! process whose path matches no marker is ignored entirely.

use safeplay_util::GameId;
use std::fs;
use std::io;
use std::path::{Component, Path};
use tracing::trace;

/// Derive a game identity from an executable path, or None if the path
/// matches no library marker.
pub fn identity_from_path(exe: &Path, markers: &[String]) -> Option<GameId> {
    let components: Vec<&str> = exe
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    for marker in markers {
        let marker_parts: Vec<&str> = marker.split('/').filter(|p| !p.is_empty()).collect();
        if marker_parts.is_empty() {
            continue;
        }

        // Find the marker as a run of consecutive path components
        for start in 0..components.len() {
            let end = start + marker_parts.len();
            if end > components.len() {
                break;
            }
            if components[start..end] != marker_parts[..] {
                continue;
            }

            // Identity is the install folder under the marker; fall back to
            // the executable name when the binary sits directly under it.
            return components
                .get(end)
                .map(|folder| GameId::new(*folder))
                .or_else(|| components.last().map(|name| GameId::new(*name)));
        }
    }

    None
}

fn exe_path(pid: &str) -> Option<std::path::PathBuf> {
    // Unreadable or vanished entries are skipped; a scan must never fail
    // because one process exited mid-walk.
    fs::read_link(format!("/proc/{pid}/exe")).ok()
}

/// Walk /proc and collect the distinct game identities currently running.
pub fn scan_candidates(markers: &[String]) -> io::Result<Vec<GameId>> {
    let mut found = Vec::new();

    for entry in fs::read_dir("/proc")? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let name = entry.file_name();
        let Some(pid) = name.to_str().filter(|n| n.bytes().all(|b| b.is_ascii_digit())) else {
            continue;
        };

        let Some(exe) = exe_path(pid) else { continue };
        if let Some(game) = identity_from_path(&exe, markers) {
            trace!(pid, game = %game, "Matched game process");
            if !found.contains(&game) {
                found.push(game);
            }
        }
    }

    Ok(found)
}

/// Collect the PIDs whose executable resolves to the given identity.
pub fn pids_for(game: &GameId, markers: &[String]) -> io::Result<Vec<i32>> {
    let mut pids = Vec::new();

    for entry in fs::read_dir("/proc")? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let name = entry.file_name();
        let Some(pid_str) = name.to_str().filter(|n| n.bytes().all(|b| b.is_ascii_digit()))
        else {
            continue;
        };

        let Some(exe) = exe_path(pid_str) else { continue };
        if identity_from_path(&exe, markers).as_ref() == Some(game) {
            if let Ok(pid) = pid_str.parse::<i32>() {
                pids.push(pid);
            }
        }
    }

    Ok(pids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn markers() -> Vec<String> {
        vec!["steamapps/common".to_string()]
    }

    #[test]
    fn install_folder_is_the_identity() {
        let exe = PathBuf::from("/home/kid/.steam/steam/steamapps/common/Celeste/Celeste.bin.x86_64");
        assert_eq!(
            identity_from_path(&exe, &markers()),
            Some(GameId::new("Celeste"))
        );
    }

    #[test]
    fn helper_binaries_collapse_to_one_identity() {
        let main = PathBuf::from("/data/steamapps/common/Hades/Hades.exe");
        let helper = PathBuf::from("/data/steamapps/common/Hades/bin/crash_handler");
        assert_eq!(
            identity_from_path(&main, &markers()),
            identity_from_path(&helper, &markers())
        );
    }

    #[test]
    fn unmarked_path_is_not_a_game() {
        let exe = PathBuf::from("/usr/bin/firefox");
        assert_eq!(identity_from_path(&exe, &markers()), None);
    }

    #[test]
    fn partial_component_match_does_not_count() {
        // "steamapps_backup/common" must not match the "steamapps/common" marker
        let exe = PathBuf::from("/data/steamapps_backup/common/Celeste/Celeste");
        assert_eq!(identity_from_path(&exe, &markers()), None);
    }

    #[test]
    fn binary_directly_under_marker_uses_its_own_name() {
        let exe = PathBuf::from("/data/steamapps/common/standalone_game");
        assert_eq!(
            identity_from_path(&exe, &markers()),
            Some(GameId::new("standalone_game"))
        );
    }

    #[test]
    fn multiple_markers_are_tried_in_order() {
        let markers = vec![
            "steamapps/common".to_string(),
            "GOG Games".to_string(),
        ];
        let exe = PathBuf::from("/home/kid/GOG Games/Cuphead/Cuphead.x86_64");
        assert_eq!(
            identity_from_path(&exe, &markers),
            Some(GameId::new("Cuphead"))
        );
    }

    #[test]
    fn scan_with_unmatched_marker_is_empty_but_ok() {
        let markers = vec!["no-such-library-fragment".to_string()];
        let found = scan_candidates(&markers).unwrap();
        assert!(found.is_empty());
    }
}
