//! LRU catalog of table descriptors
//!
//! Resolves `db/table` names into `Table` descriptors by reading the
//! table's `table.toml`, and keeps recently used descriptors in memory.

use lru::LruCache;
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use super::disk::TABLE_CONFIG_FILE;
use crate::error::{LdbError, LdbResult};
use crate::storage::table::{Table, TableConfig};

/// Catalog statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Thread-safe cache of table descriptors
pub struct TableCatalog {
    root: PathBuf,
    cache: Mutex<LruCache<String, Arc<Table>>>,
    stats: Mutex<CatalogStats>,
}

/// Split a `db/table` name
pub fn parse_table_name(name: &str) -> LdbResult<(&str, &str)> {
    let valid = |part: &str| !part.is_empty() && part != "." && part != ".." && !part.contains('\\');
    match name.split_once('/') {
        Some((db, table)) if valid(db) && valid(table) && !table.contains('/') => Ok((db, table)),
        _ => Err(LdbError::TableNotFound(format!(
            "{:?} is not of the form db/table",
            name
        ))),
    }
}

impl TableCatalog {
    /// Create a catalog over `root` holding at most `capacity` descriptors
    pub fn new(root: impl Into<PathBuf>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        TableCatalog {
            root: root.into(),
            cache: Mutex::new(LruCache::new(capacity)),
            stats: Mutex::new(CatalogStats::default()),
        }
    }

    /// Look up the descriptor of `db/table`
    pub fn open(&self, name: &str) -> LdbResult<Arc<Table>> {
        let (db, table) = parse_table_name(name)?;
        let cache_key = format!("{}/{}", db, table);

        if let Some(found) = self.cache.lock().get(&cache_key) {
            self.stats.lock().hits += 1;
            return Ok(Arc::clone(found));
        }
        self.stats.lock().misses += 1;

        let descriptor = Arc::new(self.load(db, table)?);
        tracing::debug!("Opened table {}", descriptor);

        let mut cache = self.cache.lock();
        if cache.len() >= cache.cap().get() && !cache.contains(&cache_key) {
            self.stats.lock().evictions += 1;
        }
        cache.put(cache_key, Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Drop a cached descriptor so the next open rereads its config
    pub fn invalidate(&self, name: &str) -> bool {
        self.cache.lock().pop(name).is_some()
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Get catalog statistics
    pub fn stats(&self) -> CatalogStats {
        self.stats.lock().clone()
    }

    fn load(&self, db: &str, table: &str) -> LdbResult<Table> {
        let path = self.root.join(db).join(table).join(TABLE_CONFIG_FILE);
        let text = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                LdbError::TableNotFound(format!("{}/{}", db, table))
            } else {
                LdbError::Io(e)
            }
        })?;
        Table::new(db, table, TableConfig::from_toml_str(&text)?)
    }
}
