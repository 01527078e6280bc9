//! Engine facade - resolves table names and routes calls to the traversal
//! operations

use std::io::Write;
use std::sync::Arc;

use crate::config::LdbConfig;
use crate::error::{LdbError, LdbResult};
use crate::file_manager::catalog::TableCatalog;
use crate::file_manager::disk::DiskStore;
use crate::storage::key;
use crate::storage::table::Table;

use super::dump::{self, ScanSummary};
use super::recordset;
use super::visitor::RecordVisitor;

/// An LDB instance rooted at a data directory
pub struct Ldb {
    /// Sector file access
    pub store: DiskStore,
    /// Table descriptors
    pub catalog: Arc<TableCatalog>,
}

impl Ldb {
    /// Create an instance from a config
    pub fn new(config: &LdbConfig) -> Self {
        Ldb {
            store: DiskStore::new(&config.root),
            catalog: Arc::new(TableCatalog::new(&config.root, config.catalog_capacity)),
        }
    }

    /// Resolve a `db/table` name
    pub fn table(&self, name: &str) -> LdbResult<Arc<Table>> {
        self.catalog.open(name)
    }

    /// Visit every record under `key`, returning how many were delivered
    pub fn fetch<V>(
        &self,
        table: &Table,
        key: &[u8],
        skip_subkey: bool,
        visitor: &mut V,
    ) -> LdbResult<u32>
    where
        V: RecordVisitor + ?Sized,
    {
        check_key(table, key, skip_subkey)?;
        Ok(recordset::fetch_recordset(
            &self.store,
            None,
            table,
            key,
            skip_subkey,
            visitor,
        ))
    }

    /// First non-empty record of `key`, without the length prefix
    pub fn first_record(&self, table: &Table, key: &[u8]) -> LdbResult<Option<Vec<u8>>> {
        check_key(table, key, false)?;
        let mut out = Vec::new();
        if recordset::get_first_record(&self.store, table, key, &mut out) {
            // Skip the u32 length prefix
            Ok(Some(out.split_off(4)))
        } else {
            Ok(None)
        }
    }

    /// Whether `key` has at least one record
    pub fn key_exists(&self, table: &Table, key: &[u8]) -> LdbResult<bool> {
        check_key(table, key, false)?;
        Ok(recordset::key_exists(&self.store, table, key))
    }

    /// Write every record of `table` to `out` as CSV lines
    pub fn dump<W: Write>(&self, table: &Table, hex_bytes: usize, out: W) -> LdbResult<ScanSummary> {
        dump::dump(&self.store, table, hex_bytes, out)
    }
}

/// Lookup keys must span the full `key_ln` so their subkey can match.
/// With `allow_short` any key holding at least the short key is accepted.
fn check_key(table: &Table, key: &[u8], allow_short: bool) -> LdbResult<()> {
    key::short_key(key)?;
    let key_ln = table.key_ln as usize;
    if key.len() > key_ln || (!allow_short && key.len() != key_ln) {
        return Err(LdbError::InvalidKey(format!(
            "key {} is {} bytes, table {} expects {}",
            key::to_hex(key),
            key.len(),
            table,
            key_ln
        )));
    }
    Ok(())
}
