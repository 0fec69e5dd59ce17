//! Locating executables on the search path.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolve a command name the way a typical shell would.
///
/// Behavior:
/// - Empty name: returns `None`.
/// - Name containing a path separator (e.g. `./tool`, `bin/tool`, `/usr/bin/env`):
///   checked directly, relative names against `current_dir`; `PATH` is not searched.
/// - Plain name: every directory of `search_paths` is tried in order and the first
///   executable regular file wins.
///
/// Not finding anything is not an error; callers decide how to report it.
pub fn find_command_path(search_paths: &OsStr, name: &str, current_dir: &Path) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
        let path = current_dir.join(name);
        return is_executable(&path).then_some(path);
    }

    find_in_path(search_paths, name)
}

fn find_in_path(search_paths: &OsStr, name: &str) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|path| is_executable(path))
}

/// Names of all executables on `search_paths` that start with `prefix`.
///
/// Sorted and deduplicated; unreadable directories are skipped.
pub fn executables_with_prefix(search_paths: &OsStr, prefix: &str) -> Vec<String> {
    let mut names = BTreeSet::new();
    for dir in std::env::split_paths(search_paths) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with(prefix) && !names.contains(&name) && is_executable(&entry.path()) {
                names.insert(name);
            }
        }
    }
    names.into_iter().collect()
}

/// A regular file (symlinks followed) with an execute bit set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path).map(|meta| meta.is_file()).unwrap_or(false)
}
