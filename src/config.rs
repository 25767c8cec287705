//! # Server Configuration
//!
//! Selects how many devices the server hosts and where their registers live.
//!
//! ## Storage backends
//!
//! - **Memory**: all regions allocated up front, lost on exit
//! - **File**: one hex text file per device and region under a directory,
//!   read and rewritten on every access
//!
//! Device counts outside `[1, 255]` are clamped.

use std::path::PathBuf;
use std::sync::Arc;

use crate::constants::DEFAULT_STORE_DIR;
use crate::store::{clamp_device_count, FileStore, MemoryStore, RegisterStore};

/// Default number of hosted devices.
pub const DEFAULT_DEVICE_COUNT: u8 = 1;

/// Where register data is kept
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// In-process memory
    #[default]
    Memory,
    /// Hex text files under `dir`
    File { dir: PathBuf },
}

/// Server configuration.
///
/// # Example
///
/// ```rust
/// use voltage_modbus_server::{ServerConfig, StorageBackend};
///
/// let config = ServerConfig::new()
///     .with_device_count(4)
///     .with_file_storage("/var/lib/mbserver");
///
/// assert_eq!(config.device_count, 4);
/// assert!(matches!(config.storage, StorageBackend::File { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Number of hosted devices (ids `1..=device_count`).
    pub device_count: u8,
    /// Storage backend.
    pub storage: StorageBackend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            device_count: DEFAULT_DEVICE_COUNT,
            storage: StorageBackend::Memory,
        }
    }
}

impl ServerConfig {
    /// Create a configuration hosting one device in memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of hosted devices, clamped to `[1, 255]`.
    pub fn with_device_count(mut self, count: u8) -> Self {
        self.device_count = clamp_device_count(count);
        self
    }

    /// Keep registers in memory.
    pub fn with_memory_storage(mut self) -> Self {
        self.storage = StorageBackend::Memory;
        self
    }

    /// Persist registers as hex files under `dir` (empty selects `./file-slave`).
    pub fn with_file_storage(mut self, dir: impl Into<PathBuf>) -> Self {
        let mut dir = dir.into();
        if dir.as_os_str().is_empty() {
            dir = PathBuf::from(DEFAULT_STORE_DIR);
        }
        self.storage = StorageBackend::File { dir };
        self
    }

    /// Build the configured register store.
    pub fn build_store(&self) -> Arc<dyn RegisterStore> {
        match &self.storage {
            StorageBackend::Memory => Arc::new(MemoryStore::new(self.device_count)),
            StorageBackend::File { dir } => {
                Arc::new(FileStore::new(self.device_count, dir.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.device_count, 1);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.build_store().device_count(), 1);
    }

    #[test]
    fn test_device_count_clamped() {
        assert_eq!(ServerConfig::new().with_device_count(0).device_count, 1);
        let config = ServerConfig::new().with_device_count(255);
        assert_eq!(config.device_count, crate::constants::MAX_DEVICE_COUNT);
    }

    #[test]
    fn test_file_storage_default_dir() {
        let config = ServerConfig::new().with_file_storage("");
        assert_eq!(
            config.storage,
            StorageBackend::File {
                dir: PathBuf::from(DEFAULT_STORE_DIR)
            }
        );
    }

    #[test]
    fn test_build_file_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ServerConfig::new()
            .with_device_count(3)
            .with_file_storage(dir.path())
            .build_store();

        store.save_coils(2, vec![1]).unwrap();
        assert!(dir.path().join("2-coils").exists());
        assert_eq!(store.device_count(), 3);

        let config = ServerConfig::new()
            .with_file_storage(dir.path())
            .with_memory_storage();
        assert_eq!(config.storage, StorageBackend::Memory);
    }
}
