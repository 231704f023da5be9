use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::catalog::CategorySet;
use crate::error::Result;
use crate::records::ensure_log;
use crate::settings::Preferences;

pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const USERS_FILE: &str = "users.json";
pub const BUDGETS_FILE: &str = "budgets.json";
pub const SAVINGS_FILE: &str = "savings.json";
pub const PREFERENCES_FILE: &str = "settings.json";

/// Layout of a tally data directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn transactions(&self) -> PathBuf {
        self.root.join(TRANSACTIONS_FILE)
    }

    pub fn categories(&self) -> PathBuf {
        self.root.join(CATEGORIES_FILE)
    }

    pub fn users(&self) -> PathBuf {
        self.root.join(USERS_FILE)
    }

    pub fn budgets(&self) -> PathBuf {
        self.root.join(BUDGETS_FILE)
    }

    pub fn savings(&self) -> PathBuf {
        self.root.join(SAVINGS_FILE)
    }

    pub fn preferences(&self) -> PathBuf {
        self.root.join(PREFERENCES_FILE)
    }

    pub fn backups(&self) -> PathBuf {
        self.root.join("backups")
    }

    pub fn exports(&self) -> PathBuf {
        self.root.join("exports")
    }

    /// Every persisted document and log, in a fixed order.
    pub fn data_files(&self) -> Vec<PathBuf> {
        vec![
            self.transactions(),
            self.categories(),
            self.users(),
            self.budgets(),
            self.savings(),
            self.preferences(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Key-value documents
// ---------------------------------------------------------------------------

/// Missing, empty, unreadable or malformed documents all load as `T::default()`.
pub fn load_document<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return T::default();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("could not read {}: {e}; treating as empty", path.display());
            return T::default();
        }
    };
    if content.trim().is_empty() {
        return T::default();
    }
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!("malformed document {}: {e}; treating as empty", path.display());
        T::default()
    })
}

pub fn save_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

fn create_if_missing<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if !path.exists() {
        save_document(path, value)?;
    }
    Ok(())
}

/// Create the directory and any missing file with its default content.
pub fn init_data_dir(dir: &DataDir) -> Result<()> {
    std::fs::create_dir_all(dir.root())?;
    ensure_log(&dir.transactions())?;
    create_if_missing(&dir.categories(), &CategorySet::seeded())?;
    let empty: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    create_if_missing(&dir.users(), &empty)?;
    create_if_missing(&dir.budgets(), &empty)?;
    create_if_missing(&dir.savings(), &empty)?;
    create_if_missing(&dir.preferences(), &Preferences::default())?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// A data directory plus the single-writer lock that serializes every read and
/// write against it within this process.
#[derive(Debug)]
pub struct Store {
    dir: DataDir,
    lock: Mutex<()>,
}

impl Store {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let dir = DataDir::new(root);
        init_data_dir(&dir)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &DataDir {
        &self.dir
    }

    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Delete every data file and recreate the defaults.
    pub fn reset(&self) -> Result<()> {
        let _guard = self.lock();
        for path in self.dir.data_files() {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        init_data_dir(&self.dir)?;
        info!("reset data directory {}", self.dir.root().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, serde::Deserialize, PartialEq)]
    struct Doc {
        #[serde(default)]
        name: String,
    }

    #[test]
    fn test_open_creates_default_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("data")).unwrap();
        for path in store.dir().data_files() {
            assert!(path.exists(), "missing {}", path.display());
        }
        let header = std::fs::read_to_string(store.dir().transactions()).unwrap();
        assert!(header.starts_with("Date,Type,Category"));
    }

    #[test]
    fn test_open_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(USERS_FILE), "{\"alice\": \"abc\"}").unwrap();
        Store::open(dir.path()).unwrap();
        let content = std::fs::read_to_string(dir.path().join(USERS_FILE)).unwrap();
        assert!(content.contains("alice"));
    }

    #[test]
    fn test_load_document_missing_or_malformed_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        assert_eq!(load_document::<Doc>(&path), Doc::default());

        std::fs::write(&path, "   ").unwrap();
        assert_eq!(load_document::<Doc>(&path), Doc::default());

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_document::<Doc>(&path), Doc::default());

        std::fs::write(&path, "{\"name\": \"ok\"}").unwrap();
        assert_eq!(load_document::<Doc>(&path).name, "ok");
    }

    #[test]
    fn test_reset_recreates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        std::fs::write(store.dir().users(), "{\"alice\": \"abc\"}").unwrap();
        store.reset().unwrap();
        let users = std::fs::read_to_string(store.dir().users()).unwrap();
        assert!(!users.contains("alice"));
        assert!(store.dir().transactions().exists());
    }
}
