//! Persisted preference fields and the stores backing them.

use crate::error::{SpeechError, SpeechResult};
use crate::host::PreferenceStore;
use directories::ProjectDirs;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// A scalar stored under one key, JSON-encoded.
///
/// Reads go to the store every time so several fields over the same store
/// and key always agree. Storage failures fall back to the default value.
pub struct Persisted<T> {
    key: String,
    default: T,
    store: Arc<dyn PreferenceStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Persisted<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persisted")
            .field("key", &self.key)
            .field("default", &self.default)
            .finish()
    }
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Bind `key` in `store`, writing `default` if the key is absent
    pub fn new(store: Arc<dyn PreferenceStore>, key: impl Into<String>, default: T) -> Self {
        let field = Self {
            key: key.into(),
            default,
            store,
            _marker: PhantomData,
        };
        match field.store.get(&field.key) {
            Ok(Some(_)) => {}
            Ok(None) => field.reset(),
            Err(err) => warn!("Failed to read preference '{}': {err}", field.key),
        }
        field
    }

    /// Storage key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Default value
    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Current value, or the default when missing or undecodable
    #[must_use]
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(Some(value)) => value,
            Ok(None) => self.default.clone(),
            Err(err) => {
                warn!("Using default for preference '{}': {err}", self.key);
                self.default.clone()
            }
        }
    }

    fn try_get(&self) -> SpeechResult<Option<T>> {
        self.store
            .get(&self.key)?
            .map(|raw| serde_json::from_str(&raw).map_err(SpeechError::from))
            .transpose()
    }

    /// Write `value` through to the store
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(&value) {
            warn!("Failed to persist preference '{}': {err}", self.key);
        }
    }

    fn try_set(&self, value: &T) -> SpeechResult<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(&self.key, &raw)
    }

    /// Write the default value back
    pub fn reset(&self) {
        self.set(self.default.clone());
    }
}

/// Preference store held in memory, shared by cloning the `Arc` around it
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> SpeechResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SpeechResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preference store persisted as a JSON object in one file.
///
/// Every write rewrites the whole file.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FilePreferenceStore {
    /// Open the store at `path`, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot be read
    pub fn open(path: impl AsRef<Path>) -> SpeechResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).unwrap_or_else(|err| {
                warn!("Ignoring unreadable preference file {}: {err}", path.display());
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        info!("Using preference file {}", path.display());
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Open the store at the platform config location
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined or the file cannot be read
    pub fn open_default() -> SpeechResult<Self> {
        Self::open(Self::default_path()?)
    }

    /// `preferences.json` in the platform config directory
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined
    pub fn default_path() -> SpeechResult<PathBuf> {
        let dirs = ProjectDirs::from("io", "Speechform", "speechform")
            .ok_or_else(|| SpeechError::storage("Failed to determine project directories"))?;
        Ok(dirs.config_dir().join("preferences.json"))
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, values: &HashMap<String, String>) -> SpeechResult<()> {
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> SpeechResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SpeechResult<()> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }
}
