//! Configuration persistence port.
//!
//! The engine never touches a global preferences tree. It is handed a
//! [`ConfigStore`] scoped to one axis record and calls
//! [`load`](ConfigStore::load) once at construction and
//! [`save`](ConfigStore::save) from every configuration setter.
//!
//! Two stores are provided:
//!
//! - [`MemoryStore`]: in-process table, for tests and embedding.
//! - [`TomlFileStore`]: one `[section]` per axis in a TOML file.
//!
//! ```toml
//! [focus]
//! axisUnits = "mm"
//! scale = 400.0
//! hasIndex = true
//! serialAxisIndex = 2
//! ```

use crate::error::StoreError;
use figment::providers::{Format, Toml};
use figment::Figment;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Key/value persistence for one axis record.
pub trait ConfigStore: Send + Sync {
    /// Read the whole record. A missing record is an empty table.
    fn load(&self) -> Result<toml::Table, StoreError>;

    /// Write one key synchronously.
    fn save(&self, key: &str, value: toml::Value) -> Result<(), StoreError>;

    /// Write every key of `record`.
    fn save_all(&self, record: &toml::Table) -> Result<(), StoreError> {
        for (key, value) in record {
            self.save(key, value.clone())?;
        }
        Ok(())
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Arc<Mutex<toml::Table>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `record`.
    #[must_use]
    pub fn with_record(record: toml::Table) -> Self {
        Self {
            record: Arc::new(Mutex::new(record)),
            fail_writes: Arc::default(),
        }
    }

    /// Copy of the stored record.
    #[must_use]
    pub fn snapshot(&self) -> toml::Table {
        self.record.lock().clone()
    }

    /// Stored value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<toml::Value> {
        self.record.lock().get(key).cloned()
    }

    /// Make subsequent writes fail, to exercise error paths.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<toml::Table, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, key: &str, value: toml::Value) -> Result<(), StoreError> {
        if *self.fail_writes.lock() {
            return Err(StoreError::Io(format!("write of '{key}' refused")));
        }
        self.record.lock().insert(key.to_string(), value);
        Ok(())
    }
}

// =============================================================================
// TomlFileStore
// =============================================================================

static FILE_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

/// Write lock for `path`, shared by every store in the process that writes it.
fn file_lock(path: &Path) -> Arc<Mutex<()>> {
    let key = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |dir| dir.join(path))
    };
    let registry = FILE_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    Arc::clone(registry.lock().entry(key).or_default())
}

/// Store backed by one section of a TOML file.
///
/// All stores on the same file share one write lock, so several axes can
/// persist to one file whether they were opened with [`new`](Self::new) or
/// [`with_section`](Self::with_section).
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: PathBuf,
    section: String,
    write_lock: Arc<Mutex<()>>,
}

impl TomlFileStore {
    /// Store for `section` in the file at `path`. The file is created on first write.
    ///
    /// `section` must be a bare key (no dots).
    pub fn new(path: impl AsRef<Path>, section: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            section: section.into(),
            write_lock: file_lock(path.as_ref()),
        }
    }

    /// Store for another section of the same file.
    #[must_use]
    pub fn with_section(&self, section: impl Into<String>) -> Self {
        Self {
            path: self.path.clone(),
            section: section.into(),
            write_lock: Arc::clone(&self.write_lock),
        }
    }

    /// File path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Section name.
    #[must_use]
    pub fn section(&self) -> &str {
        &self.section
    }

    fn read_document(&self) -> Result<toml::Table, StoreError> {
        if !self.path.exists() {
            return Ok(toml::Table::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        text.parse::<toml::Table>()
            .map_err(|e| StoreError::Parse(format!("{}: {e}", self.path.display())))
    }

    fn update<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut toml::Table),
    {
        let _guard = self.write_lock.lock();
        let mut document = self.read_document()?;
        let entry = document
            .entry(self.section.clone())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        match entry {
            toml::Value::Table(record) => apply(record),
            _ => {
                return Err(StoreError::Parse(format!(
                    "'{}' in {} is not a table",
                    self.section,
                    self.path.display()
                )))
            }
        }
        let text = toml::to_string_pretty(&document)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

impl ConfigStore for TomlFileStore {
    fn load(&self) -> Result<toml::Table, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "config file absent, using defaults");
            return Ok(toml::Table::new());
        }

        let figment = Figment::new().merge(Toml::file(&self.path));
        match figment.extract_inner::<toml::Table>(&self.section) {
            Ok(record) => Ok(record),
            Err(e) if e.missing() => Ok(toml::Table::new()),
            Err(e) => Err(StoreError::Parse(e.to_string())),
        }
    }

    fn save(&self, key: &str, value: toml::Value) -> Result<(), StoreError> {
        self.update(|record| {
            record.insert(key.to_string(), value);
        })
    }

    fn save_all(&self, values: &toml::Table) -> Result<(), StoreError> {
        self.update(|record| {
            for (key, value) in values {
                record.insert(key.clone(), value.clone());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_can_fail() {
        let store = MemoryStore::new();
        store.save("scale", toml::Value::Float(2.5)).unwrap();
        assert_eq!(store.load().unwrap().get("scale"), Some(&toml::Value::Float(2.5)));

        store.set_fail_writes(true);
        assert!(store.save("scale", toml::Value::Float(3.0)).is_err());
        assert_eq!(store.get("scale"), Some(toml::Value::Float(2.5)));
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlFileStore::new(dir.path().join("axes.toml"), "focus");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn file_store_sections_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let focus = TomlFileStore::new(dir.path().join("axes.toml"), "focus");
        let rotator = focus.with_section("rotator");

        focus.save("scale", toml::Value::Float(400.0)).unwrap();
        rotator
            .save("axisUnits", toml::Value::String("deg".into()))
            .unwrap();
        focus.save("hasIndex", toml::Value::Boolean(true)).unwrap();

        let record = focus.load().unwrap();
        assert_eq!(record.get("scale"), Some(&toml::Value::Float(400.0)));
        assert_eq!(record.get("hasIndex"), Some(&toml::Value::Boolean(true)));
        assert!(record.get("axisUnits").is_none());

        let record = rotator.load().unwrap();
        assert_eq!(
            record.get("axisUnits"),
            Some(&toml::Value::String("deg".into()))
        );
    }

    #[test]
    fn separately_opened_stores_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("axes.toml");

        let writers: Vec<_> = (0..4)
            .map(|n| {
                let store = TomlFileStore::new(&path, format!("axis{n}"));
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .save(&format!("key{i}"), toml::Value::Integer(i))
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        for n in 0..4 {
            let record = TomlFileStore::new(&path, format!("axis{n}")).load().unwrap();
            assert_eq!(record.len(), 25, "axis{n} lost updates");
        }
    }

    #[test]
    fn save_all_writes_the_record_in_one_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("axes.toml");
        let store = TomlFileStore::new(&path, "focus");

        let mut record = toml::Table::new();
        record.insert("scale".into(), toml::Value::Float(400.0));
        record.insert("hasIndex".into(), toml::Value::Boolean(true));
        store.save_all(&record).unwrap();

        assert_eq!(store.load().unwrap(), record);
    }

    #[test]
    fn file_store_missing_section_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("axes.toml");
        std::fs::write(&path, "[other]\nscale = 1.0\n").unwrap();

        let store = TomlFileStore::new(&path, "focus");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn file_store_rejects_non_table_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("axes.toml");
        std::fs::write(&path, "focus = 3\n").unwrap();

        let store = TomlFileStore::new(&path, "focus");
        assert!(matches!(
            store.save("scale", toml::Value::Float(1.0)),
            Err(StoreError::Parse(_))
        ));
    }
}
