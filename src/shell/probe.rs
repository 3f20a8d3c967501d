//! Executable existence probe.
//!
//! Steps probe for their tool before launching so a missing binary degrades
//! to a skip with a warning instead of surfacing as a spawn fault. Lookup
//! iterates PATH entries directly rather than shelling out to `which` —
//! `which` behavior varies across systems and is sometimes a shell builtin
//! with inconsistent error handling.

use std::path::{Path, PathBuf};

/// Check whether a file has executable permission bits set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// On Windows, executability is determined by file extension, not permission bits.
#[cfg(not(unix))]
pub fn is_executable(_path: &Path) -> bool {
    true
}

/// Resolve a tool's binary path by iterating over PATH entries.
///
/// Returns the first match that exists and is executable.
pub fn resolve_tool(tool: &str) -> Option<PathBuf> {
    // Absolute or relative paths are taken as-is.
    if tool.contains(std::path::MAIN_SEPARATOR) {
        let candidate = PathBuf::from(tool);
        return (candidate.is_file() && is_executable(&candidate)).then_some(candidate);
    }

    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(tool);
        if candidate.is_file() && is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Convenience wrapper: is `tool` launchable at all?
pub fn tool_exists(tool: &str) -> bool {
    resolve_tool(tool).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_ubiquitous_tool() {
        // `sh` is present on every Unix; `cmd.exe` lookup is covered by the
        // extension rule and not exercised here.
        #[cfg(unix)]
        assert!(resolve_tool("sh").is_some());
    }

    #[test]
    fn missing_tool_resolves_to_none() {
        assert!(resolve_tool("definitely-not-a-real-binary-4711").is_none());
        assert!(!tool_exists("definitely-not-a-real-binary-4711"));
    }

    #[cfg(unix)]
    #[test]
    fn path_with_separator_is_taken_literally() {
        assert!(resolve_tool("/bin/sh").is_some());
        assert!(resolve_tool("/bin/definitely-not-here").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_not_a_tool() {
        let temp = tempfile::TempDir::new().unwrap();
        let plain = temp.path().join("notes.txt");
        std::fs::write(&plain, "text").unwrap();
        assert!(!is_executable(&plain));
    }
}
