use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::warn;

use crate::error::StoreResult;

pub const STORAGE_FILE: &str = "storage.json";

/// Synchronous string-keyed store that survives restarts.
///
/// Values are plain text. Readers must treat anything they cannot parse as
/// absent.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> StoreResult<()>;
    fn remove(&mut self, key: &str) -> StoreResult<()>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: impl Into<String>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Single JSON object on disk, read and rewritten on every access.
///
/// Holding no cache lets several owners share one file the way browser tabs
/// share local storage: the last write wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn open(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join(STORAGE_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn load(&self) -> BTreeMap<String, String> {
        let Ok(bytes) = std::fs::read(&self.path) else {
            return BTreeMap::new();
        };
        match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %self.path.display(), "ignoring unreadable storage file: {err}");
                BTreeMap::new()
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        let encoded = serde_json::to_vec_pretty(entries)?;
        let mut opts = OpenOptions::new();
        opts.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let mut file = opts.open(&self.path)?;
        file.write_all(&encoded)?;
        file.flush()?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }

    fn set(&mut self, key: &str, value: String) -> StoreResult<()> {
        let mut entries = self.load();
        entries.insert(key.to_string(), value);
        self.save(&entries)
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        let mut entries = self.load();
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::FileStore;
    use super::KeyValueStore;

    #[test]
    fn file_store_round_trips_across_handles() {
        let dir = tempdir().expect("tmpdir");
        let mut first = FileStore::open(dir.path()).expect("open");
        first.set("a", "1".to_string()).expect("set");

        let mut second = FileStore::open(dir.path()).expect("open");
        assert_eq!(second.get("a").as_deref(), Some("1"));

        second.set("b", "2".to_string()).expect("set");
        assert_eq!(first.get("b").as_deref(), Some("2"));

        first.remove("a").expect("remove");
        assert_eq!(second.get("a"), None);
    }

    #[test]
    fn corrupt_file_reads_as_empty_and_is_overwritten() {
        let dir = tempdir().expect("tmpdir");
        let mut store = FileStore::open(dir.path()).expect("open");
        std::fs::write(store.path(), b"{not json").expect("write");

        assert_eq!(store.get("anything"), None);
        store.set("k", "v".to_string()).expect("set");
        assert_eq!(store.get("k").as_deref(), Some("v"));
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("tmpdir");
        let mut store = FileStore::open(dir.path()).expect("open");
        store.set("k", "v".to_string()).expect("set");
        let mode = std::fs::metadata(store.path())
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
