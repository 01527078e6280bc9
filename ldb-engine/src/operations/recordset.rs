//! Recordset fetcher: walk a key's node chain and visit every record
//!
//! The chain is read either from a sector already loaded in memory or
//! through a handle opened for the call. Fixed-length tables hand each
//! node to the visitor as one record. Variable-length tables are decoded
//! dataset by dataset, optionally filtered by subkey.

use std::collections::HashSet;
use std::ops::ControlFlow;

use crate::error::{LdbError, LdbResult};
use crate::file_manager::store::SectorStore;
use crate::storage::key::{self, KEY_LN};
use crate::storage::node::{datasets, validate_node, Node};
use crate::storage::sector::Sector;
use crate::storage::table::{RecordLayout, Table, MAX_REC_LN, RECORD_SAFETY_MARGIN};

use super::visitor::{FirstRecord, KeyProbe, Record, RecordVisitor};

/// Reads successive nodes of one chain
trait NodeReader {
    fn read(&mut self, next: u64) -> LdbResult<Node<'_>>;
}

/// Reads nodes out of a caller-owned sector
struct SectorReader<'a, S> {
    store: &'a S,
    sector: &'a Sector,
    table: &'a Table,
    key: &'a [u8],
}

impl<'a, S: SectorStore> NodeReader for SectorReader<'a, S> {
    fn read(&mut self, next: u64) -> LdbResult<Node<'_>> {
        self.store
            .read_sector_node(self.sector, self.table, next, self.key)
    }
}

/// Reads nodes through a handle and scratch buffer owned by one fetch
struct FileReader<'a, S: SectorStore> {
    store: &'a S,
    handle: S::Handle,
    scratch: Vec<u8>,
    table: &'a Table,
    key: &'a [u8],
}

impl<'a, S: SectorStore> NodeReader for FileReader<'a, S> {
    fn read(&mut self, next: u64) -> LdbResult<Node<'_>> {
        self.store.read_file_node(
            &mut self.handle,
            self.table,
            next,
            self.key,
            &mut self.scratch,
        )
    }
}

/// Per-call decoding state
struct ChainWalk<'a, V: ?Sized> {
    table: &'a Table,
    key: &'a [u8],
    skip_subkey: bool,
    visitor: &'a mut V,
    records: u32,
}

impl<'a, V: RecordVisitor + ?Sized> ChainWalk<'a, V> {
    /// Follow the chain until it ends or the visitor stops
    fn run<R: NodeReader>(&mut self, reader: &mut R) -> LdbResult<()> {
        let mut next = 0;
        // Nodes that link onward; a revisit means the chain loops
        let mut linked = HashSet::new();
        loop {
            let node = reader.read(next)?;
            if node.is_end() {
                break;
            }
            if linked.contains(&node.offset) {
                return Err(LdbError::malformed(node.offset, "chain loop"));
            }
            if node.next != 0 {
                linked.insert(node.offset);
            }
            next = node.next;

            if self.consume(&node).is_break() || next == 0 {
                break;
            }
        }
        Ok(())
    }

    fn consume(&mut self, node: &Node<'_>) -> ControlFlow<()> {
        match self.table.layout {
            RecordLayout::Fixed { .. } => self.deliver(None, node.data),
            RecordLayout::Variable { subkey_ln } => self.consume_datasets(node, subkey_ln as usize),
        }
    }

    fn consume_datasets(&mut self, node: &Node<'_>, subkey_ln: usize) -> ControlFlow<()> {
        if !validate_node(node.data, subkey_ln) {
            tracing::warn!(
                "Skipping malformed node ({} bytes) in {}/{} for key {}",
                node.data.len(),
                self.table.db,
                self.table.name,
                key::to_hex(self.key)
            );
            return ControlFlow::Continue(());
        }

        for dataset in datasets(node.data, subkey_ln) {
            if !self.subkey_matches(dataset.subkey) {
                continue;
            }
            for data in dataset.records() {
                if data.len() + RECORD_SAFETY_MARGIN >= MAX_REC_LN {
                    tracing::trace!("Dropping oversized record of {} bytes", data.len());
                    continue;
                }
                if self.deliver(Some(dataset.subkey), data).is_break() {
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn subkey_matches(&self, subkey: &[u8]) -> bool {
        if self.skip_subkey || subkey.is_empty() {
            return true;
        }
        key::subkey(self.key, subkey.len()) == Some(subkey)
    }

    fn deliver(&mut self, subkey: Option<&[u8]>, data: &[u8]) -> ControlFlow<()> {
        let record = Record {
            key: self.key,
            subkey,
            data,
            index: self.records,
        };
        self.records += 1;
        self.visitor.visit(&record)
    }
}

/// Visit every record stored under `key`
///
/// With a `sector`, nodes are read from that in-memory image; without one,
/// the key's sector is opened for the duration of the call. When
/// `skip_subkey` is set every dataset in the chain is visited, otherwise
/// only datasets whose subkey equals the subkey part of `key`.
///
/// Returns the number of records handed to the visitor. Failures to open
/// or read the chain end the walk early and are only logged.
pub fn fetch_recordset<S, V>(
    store: &S,
    sector: Option<&Sector>,
    table: &Table,
    key: &[u8],
    skip_subkey: bool,
    visitor: &mut V,
) -> u32
where
    S: SectorStore,
    V: RecordVisitor + ?Sized,
{
    let mut walk = ChainWalk {
        table,
        key,
        skip_subkey,
        visitor,
        records: 0,
    };

    let result = match sector {
        Some(sector) => walk.run(&mut SectorReader {
            store,
            sector,
            table,
            key,
        }),
        None => {
            let handle = match store.open(table, key) {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::debug!(
                        "Cannot open {}/{} for key {}: {}",
                        table.db,
                        table.name,
                        key::to_hex(key),
                        e
                    );
                    return 0;
                }
            };
            walk.run(&mut FileReader {
                store,
                handle,
                scratch: Vec::with_capacity(MAX_REC_LN + 1),
                table,
                key,
            })
        }
    };

    if let Err(e) = result {
        tracing::warn!(
            "Stopped reading {}/{} key {} after {} records: {}",
            table.db,
            table.name,
            key::to_hex(key.get(..KEY_LN).unwrap_or(key)),
            walk.records,
            e
        );
    }

    walk.records
}

/// Copy the first non-empty record of `key` into `out` as
/// `u32 LE length | bytes`
///
/// `out` is left untouched when the key has no such record.
pub fn get_first_record<S: SectorStore>(
    store: &S,
    table: &Table,
    key: &[u8],
    out: &mut Vec<u8>,
) -> bool {
    let mut visitor = FirstRecord::new(out);
    fetch_recordset(store, None, table, key, false, &mut visitor);
    visitor.found()
}

/// Check whether `key` has at least one record
pub fn key_exists<S: SectorStore>(store: &S, table: &Table, key: &[u8]) -> bool {
    fetch_recordset(store, None, table, key, false, &mut KeyProbe) > 0
}
