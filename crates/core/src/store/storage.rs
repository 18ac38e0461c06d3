//! Durable storage for the squad list.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::Utc;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{error::PersistenceError, squad::Squad};

/// Root directory under the user data directory used for squads.
pub const DEFAULT_DATA_DIR: &str = "xsquad";
/// File name of the squad document.
pub const DEFAULT_SQUADS_FILE: &str = "squads.json";

/// Load/save boundary for the whole squad collection.
///
/// Implementations store the list as one document; there is no partial
/// update.
pub trait SquadStorage: Send + Sync {
    /// Read the stored list; an absent store yields an empty list.
    fn load(&self) -> Result<Vec<Squad>, PersistenceError>;
    /// Replace the stored list.
    fn save(&self, squads: &[Squad]) -> Result<(), PersistenceError>;
}

/// Stores squads as a pretty-printed JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Create a storage writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user's data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DATA_DIR)
            .join(DEFAULT_SQUADS_FILE)
    }

    /// Path of the squad document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move an unreadable document aside so a fresh list can be saved.
    ///
    /// Returns the new location, or `None` when there was nothing to move.
    pub fn quarantine(&self) -> Result<Option<PathBuf>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let stem = self
            .path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("squads");
        let target = self.path.with_file_name(format!(
            "{stem}.corrupt-{}.json",
            Utc::now().format("%Y%m%d%H%M%S")
        ));
        fs::rename(&self.path, &target).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })?;
        warn!(from = %self.path.display(), to = %target.display(), "Quarantined squad document");
        Ok(Some(target))
    }

    fn write_document(&self, contents: &[u8]) -> io::Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;
        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(contents)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl Default for JsonFileStorage {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl SquadStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<Squad>, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No squad document yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&content).map_err(|source| PersistenceError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, squads: &[Squad]) -> Result<(), PersistenceError> {
        let serialised = serde_json::to_vec_pretty(squads).map_err(PersistenceError::Encode)?;
        self.write_document(&serialised)
            .map_err(|source| PersistenceError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), squads = squads.len(), "Squads saved");
        Ok(())
    }
}

/// Keeps the squad list in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    squads: Mutex<Vec<Squad>>,
}

impl MemoryStorage {
    /// Storage pre-populated with `squads`.
    pub fn with_squads(squads: Vec<Squad>) -> Self {
        Self {
            squads: Mutex::new(squads),
        }
    }

    /// Copy of the last saved list.
    pub fn snapshot(&self) -> Vec<Squad> {
        self.squads.lock().clone()
    }
}

impl SquadStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<Squad>, PersistenceError> {
        Ok(self.squads.lock().clone())
    }

    fn save(&self, squads: &[Squad]) -> Result<(), PersistenceError> {
        *self.squads.lock() = squads.to_vec();
        Ok(())
    }
}
