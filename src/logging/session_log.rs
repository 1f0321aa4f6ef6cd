//! Per-profile session log
//!
//! One timestamped line per transfer attempt, appended to the file named by
//! the profile. Write failures are only reported at debug level so a broken
//! share never turns a transfer into a failure.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, message: &str) {
        if let Err(e) = self.try_append(message) {
            debug!("Failed to write session log {:?}: {}", self.path, e);
        }
    }

    fn try_append(&self, message: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{}] {}", timestamp, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_creates_and_appends() {
        let temp = tempfile::tempdir().unwrap();
        let log = SessionLog::new(temp.path().join("logs").join("BackupLog.txt"));

        log.append("attempt 1");
        log.append("attempt 2");

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] attempt 1"));
        assert!(lines[1].starts_with('['));
    }
}
