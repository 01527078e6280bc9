use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::LdbResult;

/// Configuration for an LDB instance
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LdbConfig {
    /// Data root holding `<db>/<table>/` directories (default: /var/lib/ldb)
    pub root: PathBuf,

    /// Number of table descriptors kept by the catalog (default: 64)
    pub catalog_capacity: usize,

    /// Leading record bytes printed as hex by dumps (default: 0)
    pub hex_bytes: usize,

    /// Log level for front ends (default: info)
    pub log_level: String,
}

impl Default for LdbConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/lib/ldb"),
            catalog_capacity: 64,
            hex_bytes: 0,
            log_level: "info".to_string(),
        }
    }
}

impl LdbConfig {
    /// Create a new config with the given data root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Parse a config from TOML text; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> LdbResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file
    pub fn load(path: &Path) -> LdbResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set the catalog capacity
    pub fn catalog_capacity(mut self, capacity: usize) -> Self {
        self.catalog_capacity = capacity;
        self
    }

    /// Set the number of leading bytes dumped as hex
    pub fn hex_bytes(mut self, hex_bytes: usize) -> Self {
        self.hex_bytes = hex_bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LdbError;

    #[test]
    fn test_defaults() {
        let config = LdbConfig::default();
        assert_eq!(config.root, PathBuf::from("/var/lib/ldb"));
        assert_eq!(config.catalog_capacity, 64);
        assert_eq!(config.hex_bytes, 0);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_partial_toml() {
        let config = LdbConfig::from_toml_str("root = \"/data/ldb\"\nhex_bytes = 8\n").unwrap();
        assert_eq!(config.root, PathBuf::from("/data/ldb"));
        assert_eq!(config.hex_bytes, 8);
        assert_eq!(config.catalog_capacity, 64);
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            LdbConfig::from_toml_str("hex_bytes = \"lots\""),
            Err(LdbError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = LdbConfig::new("/tmp/ldb").catalog_capacity(4).hex_bytes(2);
        assert_eq!(config.root, PathBuf::from("/tmp/ldb"));
        assert_eq!(config.catalog_capacity, 4);
        assert_eq!(config.hex_bytes, 2);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ldb.toml");
        fs::write(&path, "catalog_capacity = 3\nlog_level = \"debug\"\n").unwrap();
        let config = LdbConfig::load(&path).unwrap();
        assert_eq!(config.catalog_capacity, 3);
        assert_eq!(config.log_level, "debug");
    }
}
