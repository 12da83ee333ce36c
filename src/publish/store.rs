//! Object store abstraction and the local-directory implementation.

use crate::utils::error::PublishError;
use log::debug;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// Minimal object store: whole-object reads and overwriting writes
pub trait ObjectStore {
    /// Read an object; `Ok(None)` when it does not exist
    fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, PublishError>;

    /// Create or overwrite an object
    fn put_object(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), PublishError>;

    /// Human-readable location of `key`, for logs
    fn describe(&self, key: &str) -> String;
}

/// Object store backed by a directory; keys are relative paths
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key under the root, refusing anything that escapes it
    fn path_for(&self, key: &str) -> Result<PathBuf, PublishError> {
        let relative = Path::new(key);

        if key.is_empty() {
            return Err(PublishError::InvalidDestination("Object key is empty".to_string()));
        }

        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(PublishError::InvalidDestination(format!(
                "Object key must be a relative path: {}",
                key
            )));
        }

        Ok(self.root.join(relative))
    }
}

impl ObjectStore for LocalStore {
    fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, PublishError> {
        let path = self.path_for(key)?;

        if !path.exists() {
            return Ok(None);
        }

        if path.is_dir() {
            return Err(PublishError::InvalidDestination(format!(
                "Path is a directory: {}",
                path.display()
            )));
        }

        Ok(Some(fs::read(&path)?))
    }

    /// Write through a temp file in the same directory, then rename
    fn put_object(&self, key: &str, body: &[u8], _content_type: &str) -> Result<(), PublishError> {
        let path = self.path_for(key)?;

        if path.is_dir() {
            return Err(PublishError::InvalidDestination(format!(
                "Path is a directory: {}",
                path.display()
            )));
        }

        let parent = path.parent().unwrap_or(&self.root);
        if !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            fs::create_dir_all(parent)?;
        }

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(body)?;
        file.flush()?;
        file.persist(&path).map_err(|e| PublishError::Io(e.error))?;

        debug!("Wrote {} bytes to {}", body.len(), path.display());

        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        assert!(store.get_object("report/latest.json").unwrap().is_none());

        store
            .put_object("report/latest.json", b"{}", "application/json")
            .unwrap();

        assert_eq!(
            store.get_object("report/latest.json").unwrap(),
            Some(b"{}".to_vec())
        );
    }

    #[test]
    fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.put_object("a.json", b"1", "application/json").unwrap();
        store.put_object("a.json", b"2", "application/json").unwrap();

        assert_eq!(store.get_object("a.json").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        assert!(store.put_object("../evil.json", b"x", "application/json").is_err());
        assert!(store.put_object("/etc/evil.json", b"x", "application/json").is_err());
        assert!(store.put_object("", b"x", "application/json").is_err());
    }

    #[test]
    fn test_rejects_directory_target() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let store = LocalStore::new(dir.path());

        assert!(store.put_object("sub", b"x", "application/json").is_err());
    }
}
