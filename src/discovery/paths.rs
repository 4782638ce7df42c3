//! On-disk locations of discovery sessions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Per-session files, keyed by sanitized player tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    dir: PathBuf,
    tag: String,
}

impl SessionPaths {
    /// Paths under the default directory, `~/.cr-api/discover`.
    pub fn new(tag: &str) -> Self {
        Self::in_dir(default_session_dir(), tag)
    }

    /// Paths under an explicit directory.
    pub fn in_dir(dir: impl Into<PathBuf>, tag: &str) -> Self {
        Self {
            dir: dir.into(),
            tag: tag.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn checkpoint(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.tag))
    }

    pub fn pid(&self) -> PathBuf {
        self.dir.join(format!("{}.pid", self.tag))
    }

    pub fn log(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.tag))
    }

    /// Create the session directory if it does not exist.
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }
}

/// `~/.cr-api/discover`, falling back to the working directory without a home.
pub fn default_session_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cr-api")
        .join("discover")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_file_names() {
        let paths = SessionPaths::in_dir("/tmp/sessions", "ABC123");
        assert_eq!(paths.checkpoint(), PathBuf::from("/tmp/sessions/ABC123.json"));
        assert_eq!(paths.pid(), PathBuf::from("/tmp/sessions/ABC123.pid"));
        assert_eq!(paths.log(), PathBuf::from("/tmp/sessions/ABC123.log"));
    }

    #[test]
    fn test_default_dir_layout() {
        let dir = default_session_dir();
        assert!(dir.ends_with(".cr-api/discover"));
        assert_eq!(SessionPaths::new("X").dir(), dir.as_path());
    }

    #[test]
    fn test_default_dir_under_platform_home() {
        let dir = default_session_dir();
        match dirs::home_dir() {
            Some(home) => assert_eq!(dir, home.join(".cr-api").join("discover")),
            None => assert_eq!(dir, PathBuf::from(".").join(".cr-api").join("discover")),
        }
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = SessionPaths::in_dir(tmp.path().join("a").join("b"), "T");
        paths.ensure_dir().unwrap();
        assert!(paths.dir().is_dir());
    }
}
