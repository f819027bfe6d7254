//! Key-value backends.
//!
//! Values are opaque JSON strings; the repository layer owns encoding.
//! Writes are whole-value replace, never merge.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};

/// Minimal keyed store contract.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value at `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Delete several keys in the order given.
    ///
    /// Backends that can do this atomically override it.
    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        for k in keys {
            self.remove(k)?;
        }
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        (**self).remove_all(keys)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local store. Used by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    /// Keys currently present (sorted).
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.keys().cloned().collect())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries()?;
        for k in keys {
            entries.remove(*k);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON files
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key under `dir`.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// reader never observes a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            bail!("invalid store key: {key:?}");
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create store dir {}", self.dir.display()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move {} into place", path.display()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let s = MemoryStore::new();
        assert_eq!(s.get("k").unwrap(), None);
        s.set("k", "1").unwrap();
        s.set("k", "2").unwrap();
        assert_eq!(s.get("k").unwrap().as_deref(), Some("2"));
        s.remove("k").unwrap();
        s.remove("k").unwrap();
        assert_eq!(s.get("k").unwrap(), None);
    }

    #[test]
    fn memory_store_remove_all() {
        let s = MemoryStore::new();
        s.set("a", "1").unwrap();
        s.set("b", "2").unwrap();
        s.set("c", "3").unwrap();
        s.remove_all(&["a", "b"]).unwrap();
        assert_eq!(s.keys().unwrap(), vec!["c".to_string()]);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let s = JsonFileStore::new(dir.path().join("nested"));
        assert_eq!(s.get("virtual_portfolio").unwrap(), None);
        s.set("virtual_portfolio", "{\"cash\":1}").unwrap();
        assert_eq!(
            s.get("virtual_portfolio").unwrap().as_deref(),
            Some("{\"cash\":1}")
        );
        assert!(dir.path().join("nested/virtual_portfolio.json").exists());
        assert!(!dir.path().join("nested/virtual_portfolio.json.tmp").exists());
        s.remove("virtual_portfolio").unwrap();
        s.remove("virtual_portfolio").unwrap();
        assert_eq!(s.get("virtual_portfolio").unwrap(), None);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let s = JsonFileStore::new(dir.path());
        assert!(s.set("../escape", "x").is_err());
        assert!(s.get("").is_err());
    }
}
