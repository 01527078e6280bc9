//! The I/O collaborator consumed by the fetcher and the scanner
//!
//! A store knows how to load a whole sector into memory, open a sector for
//! direct reads, and read single nodes of a key's chain from either.

use crate::error::LdbResult;
use crate::storage::node::Node;
use crate::storage::sector::Sector;
use crate::storage::table::Table;

/// Source of sectors and chain nodes for a table
pub trait SectorStore {
    /// Open sector used for direct reads; released when dropped
    type Handle;

    /// Load the full sector for first key byte `k0`
    ///
    /// `Ok(None)` means nothing is stored under that prefix.
    fn load_sector(&self, table: &Table, k0: u8) -> LdbResult<Option<Sector>>;

    /// Open the sector holding `key` for direct node reads
    fn open(&self, table: &Table, key: &[u8]) -> LdbResult<Self::Handle>;

    /// Read one node of `key`'s chain from a loaded sector
    ///
    /// `next` is 0 for the first node of the chain, otherwise the token
    /// returned with the previous node.
    fn read_sector_node<'a>(
        &'a self,
        sector: &'a Sector,
        _table: &Table,
        next: u64,
        key: &[u8],
    ) -> LdbResult<Node<'a>> {
        sector.read_node(next, key)
    }

    /// Read one node of `key`'s chain through an open handle into `scratch`
    fn read_file_node<'a>(
        &'a self,
        handle: &mut Self::Handle,
        table: &Table,
        next: u64,
        key: &[u8],
        scratch: &'a mut Vec<u8>,
    ) -> LdbResult<Node<'a>>;

    /// Existence index lookup for a short key in a loaded sector
    fn has_pointer(&self, sector: &Sector, key: &[u8]) -> bool {
        sector.has_pointer(key)
    }
}
