//! Path helpers for remote SFTP paths and local download targets
//!
//! Remote SFTP paths always use `/`, whatever the local platform is.

use std::path::{Path, PathBuf};

/// Join remote SFTP path components using `/` separator.
pub fn join_remote_path(base: &str, component: &str) -> String {
    if base.is_empty() {
        component.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, component)
    } else {
        format!("{}/{}", base, component)
    }
}

/// Split a remote `path/mask` into its directory and the trailing mask.
///
/// `"/outgoing/*.csv"` → `("/outgoing", "*.csv")`, `"*.csv"` → `(".", "*.csv")`,
/// `"/report.csv"` → `("/", "report.csv")`.
pub fn split_remote_mask(path_and_mask: &str) -> (String, String) {
    match path_and_mask.rfind('/') {
        Some(0) => ("/".to_string(), path_and_mask[1..].to_string()),
        Some(idx) => (
            path_and_mask[..idx].to_string(),
            path_and_mask[idx + 1..].to_string(),
        ),
        None => (".".to_string(), path_and_mask.to_string()),
    }
}

/// Convert a Windows-style path to the `/`-separated form SFTP servers expect.
///
/// Blank input yields an empty string.
pub fn windows_to_linux_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    trimmed.replace('\\', "/")
}

/// Resolve a `/`-separated relative remote path under a local directory.
///
/// Components that would escape `base` (`..`, absolute roots) are rejected.
pub fn local_target(base: &Path, relative: &str) -> Option<PathBuf> {
    let mut target = base.to_path_buf();
    for part in relative.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            p if p.contains('\\') || p.contains(':') => return None,
            p => target.push(p),
        }
    }
    if target == base {
        None
    } else {
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_remote_path() {
        assert_eq!(join_remote_path("/home", "file.txt"), "/home/file.txt");
        assert_eq!(join_remote_path("/home/", "file.txt"), "/home/file.txt");
        assert_eq!(join_remote_path("/", "home"), "/home");
        assert_eq!(join_remote_path("", "Reports"), "Reports");
    }

    #[test]
    fn test_split_remote_mask() {
        assert_eq!(
            split_remote_mask("/outgoing/*.csv"),
            ("/outgoing".to_string(), "*.csv".to_string())
        );
        assert_eq!(
            split_remote_mask("/report.csv"),
            ("/".to_string(), "report.csv".to_string())
        );
        assert_eq!(
            split_remote_mask("*.csv"),
            (".".to_string(), "*.csv".to_string())
        );
    }

    #[test]
    fn test_windows_to_linux_path() {
        assert_eq!(windows_to_linux_path(" delivery\\files\\ "), "delivery/files/");
        assert_eq!(windows_to_linux_path("already/unix"), "already/unix");
        assert_eq!(windows_to_linux_path("   "), "");
    }

    #[test]
    fn test_local_target_rejects_escapes() {
        let base = Path::new("/data/in");
        assert_eq!(
            local_target(base, "Reports/a.csv"),
            Some(PathBuf::from("/data/in/Reports/a.csv"))
        );
        assert_eq!(local_target(base, "../etc/passwd"), None);
        assert_eq!(local_target(base, ""), None);
        assert_eq!(local_target(base, "c:\\evil"), None);
    }
}
