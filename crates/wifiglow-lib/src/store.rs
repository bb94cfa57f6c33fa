//! File-backed credential store.
//!
//! Credentials are a flat TOML table (`ssid = "..."`, `password = "..."`).
//! A missing file is an empty store; clearing removes the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, WifiglowError};
use crate::hal::CredentialStore;

/// Write `contents` to `path` atomically (temp file, then rename), creating
/// parent directories as needed.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, contents)?;
    match std::fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(_) => {
            // Rename can fail across filesystems; fall back to direct write + cleanup
            let result = std::fs::write(path, contents);
            let _ = std::fs::remove_file(&tmp);
            result
        }
    }
}

/// [`CredentialStore`] persisted to a TOML file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&contents)
            .map_err(|e| WifiglowError::Store(format!("{}: {e}", self.path.display())))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let serialized =
            toml::to_string(entries).map_err(|e| WifiglowError::Store(e.to_string()))?;
        write_atomic(&self.path, &serialized)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        // An unreadable file is replaced rather than blocking provisioning.
        let mut entries = self.read_all().unwrap_or_else(|e| {
            log::warn!("overwriting unreadable credential file: {e}");
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{KEY_PASSWORD, KEY_SSID};

    fn store() -> (tempfile::TempDir, FileCredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.toml"));
        (dir, store)
    }

    #[test]
    fn missing_file_is_empty() {
        let (_dir, s) = store();
        assert_eq!(s.get(KEY_SSID).unwrap(), None);
    }

    #[test]
    fn put_then_get() {
        let (_dir, mut s) = store();
        s.put(KEY_SSID, "home").unwrap();
        s.put(KEY_PASSWORD, "p@ss \"quoted\"").unwrap();
        assert_eq!(s.get(KEY_SSID).unwrap().as_deref(), Some("home"));
        assert_eq!(
            s.get(KEY_PASSWORD).unwrap().as_deref(),
            Some("p@ss \"quoted\"")
        );
    }

    #[test]
    fn values_survive_a_new_instance() {
        let (_dir, mut s) = store();
        s.put(KEY_SSID, "home").unwrap();
        let reopened = FileCredentialStore::new(s.path());
        assert_eq!(reopened.get(KEY_SSID).unwrap().as_deref(), Some("home"));
    }

    #[test]
    fn clear_removes_everything() {
        let (_dir, mut s) = store();
        s.put(KEY_SSID, "home").unwrap();
        s.clear().unwrap();
        assert!(!s.path().exists());
        assert_eq!(s.get(KEY_SSID).unwrap(), None);
        // Clearing an empty store is fine.
        s.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_a_store_error() {
        let (_dir, s) = store();
        std::fs::write(s.path(), "ssid = [broken").unwrap();
        let err = s.get(KEY_SSID).unwrap_err();
        assert!(matches!(err, WifiglowError::Store(_)));
    }

    #[test]
    fn put_replaces_corrupt_file() {
        let (_dir, mut s) = store();
        std::fs::write(s.path(), "ssid = [broken").unwrap();
        s.put(KEY_SSID, "home").unwrap();
        assert_eq!(s.get(KEY_SSID).unwrap().as_deref(), Some("home"));
    }

    #[test]
    fn write_atomic_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("x.toml");
        write_atomic(&path, "k = 1\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "k = 1\n");
    }
}
