// src/exec/resolve.rs

//! Host command lookup.

use std::env;
use std::path::{Path, PathBuf};

/// Resolve `command` to an executable path, or `None` if nothing matches.
///
/// A command containing a path separator is treated as already qualified and
/// only checked for existence/executability. A bare name is searched on
/// `PATH`, probing `PATHEXT` extensions on Windows.
pub fn resolve_command(command: &str) -> Option<PathBuf> {
    if command.is_empty() {
        return None;
    }

    if is_qualified(command) {
        return existing_executable(Path::new(command));
    }

    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        if let Some(found) = existing_executable(&dir.join(command)) {
            return Some(found);
        }
    }
    None
}

fn is_qualified(command: &str) -> bool {
    command.contains('/') || command.contains(std::path::MAIN_SEPARATOR)
}

#[cfg(unix)]
fn existing_executable(path: &Path) -> Option<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::metadata(path).ok()?;
    if meta.is_file() && meta.permissions().mode() & 0o111 != 0 {
        Some(path.to_path_buf())
    } else {
        None
    }
}

#[cfg(windows)]
fn existing_executable(path: &Path) -> Option<PathBuf> {
    // An explicit extension wins; otherwise probe the PATHEXT list the way
    // the platform shell would.
    if path.extension().is_some() {
        return path.is_file().then(|| path.to_path_buf());
    }

    let exts = env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
    for ext in exts.split(';').filter(|e| !e.is_empty()) {
        let candidate = path.with_extension(ext.trim_start_matches('.'));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    path.is_file().then(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_are_found_on_path() {
        #[cfg(unix)]
        assert!(resolve_command("sh").is_some());
        #[cfg(windows)]
        assert!(resolve_command("cmd").is_some());
    }

    #[test]
    fn unknown_commands_resolve_to_none() {
        assert!(resolve_command("definitely-not-a-real-binary-xyz").is_none());
        assert!(resolve_command("").is_none());
    }

    #[test]
    fn qualified_paths_bypass_path_search() {
        let exe = std::env::current_exe().expect("test binary has a path");
        let resolved = resolve_command(exe.to_str().expect("utf-8 path"));
        assert_eq!(resolved, Some(exe));
    }

    #[test]
    fn qualified_path_to_a_missing_file_is_none() {
        assert!(resolve_command("/definitely/not/here/xyz").is_none());
    }
}
