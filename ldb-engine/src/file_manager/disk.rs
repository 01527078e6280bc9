//! File-backed sector store
//!
//! Tables live under `<root>/<db>/<table>/`, with one `<k0>.ldb` file per
//! first key byte next to the table's `table.toml`.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;

use byteorder::{LittleEndian, ReadBytesExt};

use super::store::SectorStore;
use crate::error::{LdbError, LdbResult};
use crate::storage::key::short_key;
use crate::storage::node::Node;
use crate::storage::sector::{
    map_pointer_pos, sector_file_name, NodeHeader, Sector, MAP_SIZE, PTR_LN,
};
use crate::storage::table::Table;

/// Table configuration file name inside a table directory
pub const TABLE_CONFIG_FILE: &str = "table.toml";

/// Sector store reading `.ldb` files from a data root
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DiskStore { root: root.into() }
    }

    /// Directory holding the sectors of `db/table`
    pub fn table_dir(&self, db: &str, table: &str) -> PathBuf {
        self.root.join(db).join(table)
    }

    /// Path of the sector file for first key byte `k0`
    pub fn sector_path(&self, table: &Table, k0: u8) -> PathBuf {
        self.table_dir(&table.db, &table.name)
            .join(sector_file_name(k0))
    }
}

impl SectorStore for DiskStore {
    type Handle = File;

    fn load_sector(&self, table: &Table, k0: u8) -> LdbResult<Option<Sector>> {
        let path = self.sector_path(table, k0);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if (data.len() as u64) < MAP_SIZE {
            return Err(LdbError::InvalidFormat(format!(
                "{}: {} bytes is smaller than the sector map",
                path.display(),
                data.len()
            )));
        }

        tracing::debug!("Loaded sector {:?} ({} bytes)", path, data.len());
        Ok(Some(Sector::new(k0, data)))
    }

    fn open(&self, table: &Table, key: &[u8]) -> LdbResult<File> {
        let k0 = short_key(key)?[0];
        Ok(File::open(self.sector_path(table, k0))?)
    }

    fn read_file_node<'a>(
        &'a self,
        handle: &mut File,
        _table: &Table,
        next: u64,
        key: &[u8],
        scratch: &'a mut Vec<u8>,
    ) -> LdbResult<Node<'a>> {
        let offset = if next == 0 {
            handle.seek(SeekFrom::Start(map_pointer_pos(key)?))?;
            match handle.read_uint::<LittleEndian>(PTR_LN) {
                Ok(0) => return Ok(Node::empty()),
                Ok(ptr) => ptr,
                // Map shorter than the slot: nothing stored for this key
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(Node::empty()),
                Err(e) => return Err(e.into()),
            }
        } else {
            next
        };

        if offset < MAP_SIZE {
            return Err(LdbError::malformed(offset, "node pointer inside the map"));
        }

        handle.seek(SeekFrom::Start(offset))?;
        let header = NodeHeader::read_from(handle, offset)?;

        scratch.clear();
        scratch.resize(header.size, 0);
        handle.read_exact(scratch).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                LdbError::malformed(offset, "node runs past end of file")
            } else {
                LdbError::Io(e)
            }
        })?;

        Ok(Node {
            data: scratch.as_slice(),
            next: header.next,
            offset,
        })
    }
}
