use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sakina_types::models::Identity;

use crate::error::{BoardError, Result};

/// Storage key of the persisted identity record.
pub const IDENTITY_KEY: &str = "sakina.identity";

/// Storage key of the prayer-time preferences.
pub const PRAYER_KEY: &str = "sakina.prayer";

/// String key/value storage on the user's device.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local storage, lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries)?.remove(key);
        Ok(())
    }
}

/// All keys in one JSON object on disk. Every write replaces the file via a
/// temporary sibling and a rename, so a crash never leaves it half-written.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: &Path) -> Result<Self> {
        let entries = match std::fs::read_to_string(path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Profile storage at {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries)?;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries)?;
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    m.lock()
        .map_err(|e| BoardError::Storage(format!("lock poisoned: {}", e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    #[default]
    Gps,
    City,
}

/// How the reader wants prayer times looked up and announced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrayerPreferences {
    pub city: Option<String>,
    pub location_mode: LocationMode,
    pub notifications: bool,
    pub notify_minutes_before: u32,
}

impl Default for PrayerPreferences {
    fn default() -> Self {
        Self {
            city: None,
            location_mode: LocationMode::Gps,
            notifications: false,
            notify_minutes_before: 10,
        }
    }
}

/// Typed records over a device key/value store.
#[derive(Clone)]
pub struct LocalProfileStore {
    storage: Arc<dyn KeyValueStore>,
}

impl LocalProfileStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn on_disk(path: &Path) -> Result<Self> {
        Ok(Self::new(Arc::new(FileStorage::open(path)?)))
    }

    pub fn load_identity(&self) -> Result<Option<Identity>> {
        self.load(IDENTITY_KEY)
    }

    pub fn save_identity(&self, identity: &Identity) -> Result<()> {
        self.save(IDENTITY_KEY, identity)?;
        info!("Identity saved as '{}'", identity.name);
        Ok(())
    }

    pub fn clear_identity(&self) -> Result<()> {
        self.storage.remove(IDENTITY_KEY)
    }

    /// Preferences fall back to defaults when never saved.
    pub fn load_preferences(&self) -> Result<PrayerPreferences> {
        Ok(self.load(PRAYER_KEY)?.unwrap_or_default())
    }

    pub fn save_preferences(&self, prefs: &PrayerPreferences) -> Result<()> {
        self.save(PRAYER_KEY, prefs)
    }

    fn load<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
        match self.storage.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.storage.set(key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            name: "Faithful Traveller".into(),
            secret_hash: "0".repeat(64),
            anonymous: true,
        }
    }

    #[test]
    fn memory_roundtrip_and_clear() {
        let profile = LocalProfileStore::in_memory();
        assert!(profile.load_identity().unwrap().is_none());

        profile.save_identity(&identity()).unwrap();
        assert_eq!(profile.load_identity().unwrap(), Some(identity()));

        profile.clear_identity().unwrap();
        assert!(profile.load_identity().unwrap().is_none());
    }

    #[test]
    fn identity_record_shape() {
        let storage = Arc::new(MemoryStorage::new());
        let profile = LocalProfileStore::new(storage.clone());
        profile.save_identity(&identity()).unwrap();

        let raw = storage.get(IDENTITY_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["name"], "Faithful Traveller");
        assert_eq!(value["anonymous"], true);
        assert_eq!(value["secretHash"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.json");

        let profile = LocalProfileStore::on_disk(&path).unwrap();
        profile.save_identity(&identity()).unwrap();
        let prefs = PrayerPreferences {
            city: Some("Leeds".into()),
            location_mode: LocationMode::City,
            notifications: true,
            notify_minutes_before: 15,
        };
        profile.save_preferences(&prefs).unwrap();
        drop(profile);

        let reopened = LocalProfileStore::on_disk(&path).unwrap();
        assert_eq!(reopened.load_identity().unwrap(), Some(identity()));
        assert_eq!(reopened.load_preferences().unwrap(), prefs);
    }

    #[test]
    fn preferences_default_when_missing() {
        let profile = LocalProfileStore::in_memory();
        let prefs = profile.load_preferences().unwrap();
        assert_eq!(prefs.notify_minutes_before, 10);
        assert_eq!(prefs.location_mode, LocationMode::Gps);
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(FileStorage::open(&path), Err(BoardError::Storage(_))));
    }
}
