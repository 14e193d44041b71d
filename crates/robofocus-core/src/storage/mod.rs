mod config;
pub mod database;
pub mod ledger;
pub mod shield;
pub mod widget;

pub use config::{BlockingConfig, Config, NotificationsConfig, TimerConfig};
pub use database::{Database, Stats};
pub use ledger::{LocalLedger, Streak};
pub use shield::{ShieldFile, ShieldState};
pub use widget::WidgetFile;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{ConfigError, DatabaseError};

/// Returns the data directory, creating it if needed.
///
/// `ROBOFOCUS_DATA_DIR` wins when set. Otherwise `~/.config/robofocus/`,
/// or `~/.config/robofocus-dev/` when `ROBOFOCUS_ENV=dev`.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("ROBOFOCUS_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ROBOFOCUS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("robofocus-dev")
            } else {
                base_dir.join("robofocus")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// String key-value persistence for small records such as the timer state.
pub trait KvStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError>;
    fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError>;
    fn kv_delete(&self, key: &str) -> Result<(), DatabaseError>;
}

/// In-process store. Nothing survives the process; for tests and embedders
/// that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, DatabaseError> {
        self.entries.lock().map_err(|_| DatabaseError::Locked)
    }
}

impl KvStore for MemoryStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        (**self).kv_get(key)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        (**self).kv_set(key, value)
    }

    fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        (**self).kv_delete(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        assert!(store.kv_get("k").unwrap().is_none());
        store.kv_set("k", "v").unwrap();
        assert_eq!(store.kv_get("k").unwrap().as_deref(), Some("v"));
        store.kv_delete("k").unwrap();
        assert!(store.kv_get("k").unwrap().is_none());
    }
}
