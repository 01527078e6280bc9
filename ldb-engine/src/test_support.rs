//! Fixtures shared by the unit tests: node and sector builders plus an
//! instrumented in-memory store.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{LdbError, LdbResult};
use crate::file_manager::store::SectorStore;
use crate::storage::key::{short_key, slot_index, SLOTS_PER_SECTOR};
use crate::storage::node::Node;
use crate::storage::sector::{map_pointer_pos, Sector, MAP_SIZE, NODE_HEADER_LN, PTR_LN};
use crate::storage::table::Table;

/// Builds the payload of a variable-length node
pub struct NodeBuilder {
    subkey_ln: usize,
    buf: Vec<u8>,
}

impl NodeBuilder {
    pub fn new(subkey_ln: usize) -> Self {
        NodeBuilder {
            subkey_ln,
            buf: Vec::new(),
        }
    }

    /// Append a dataset holding `records`
    pub fn dataset<R: AsRef<[u8]>>(mut self, subkey: &[u8], records: &[R]) -> Self {
        assert_eq!(subkey.len(), self.subkey_ln);
        let mut payload = Vec::new();
        for record in records {
            let record = record.as_ref();
            payload.write_u16::<LittleEndian>(record.len() as u16).unwrap();
            payload.extend_from_slice(record);
        }
        self.buf.extend_from_slice(subkey);
        self.buf.write_u16::<LittleEndian>(payload.len() as u16).unwrap();
        self.buf.extend_from_slice(&payload);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

/// Sector file contents, kept sparse until written out
pub struct SectorImage {
    k0: u8,
    pointers: BTreeMap<u64, u64>,
    nodes: Vec<u8>,
}

impl SectorImage {
    pub fn new(k0: u8) -> Self {
        SectorImage {
            k0,
            pointers: BTreeMap::new(),
            nodes: Vec::new(),
        }
    }

    /// Append a chain of nodes for `key` and point its map slot at it
    pub fn push_chain(&mut self, key: &[u8], nodes: &[Vec<u8>]) {
        assert_eq!(key[0], self.k0);
        let first = MAP_SIZE + self.nodes.len() as u64;
        for (i, data) in nodes.iter().enumerate() {
            let offset = MAP_SIZE + self.nodes.len() as u64;
            let next = if i + 1 < nodes.len() {
                offset + (NODE_HEADER_LN + data.len()) as u64
            } else {
                0
            };
            self.nodes.write_uint::<LittleEndian>(next, PTR_LN).unwrap();
            self.nodes.write_u32::<LittleEndian>(data.len() as u32).unwrap();
            self.nodes.extend_from_slice(data);
        }
        if !nodes.is_empty() {
            self.pointers.insert(map_pointer_pos(key).unwrap(), first);
        }
    }

    /// Append a single node for `key` whose next pointer is its own offset
    pub fn push_looping_node(&mut self, key: &[u8], data: &[u8]) {
        assert_eq!(key[0], self.k0);
        let offset = MAP_SIZE + self.nodes.len() as u64;
        self.nodes.write_uint::<LittleEndian>(offset, PTR_LN).unwrap();
        self.nodes.write_u32::<LittleEndian>(data.len() as u32).unwrap();
        self.nodes.extend_from_slice(data);
        self.pointers.insert(map_pointer_pos(key).unwrap(), offset);
    }

    /// Full in-memory image, as loaded from disk
    pub fn into_sector(self) -> Sector {
        let mut data = vec![0u8; MAP_SIZE as usize];
        for (pos, ptr) in &self.pointers {
            let pos = *pos as usize;
            (&mut data[pos..pos + PTR_LN])
                .write_uint::<LittleEndian>(*ptr, PTR_LN)
                .unwrap();
        }
        data.extend_from_slice(&self.nodes);
        Sector::new(self.k0, data)
    }

    /// Write a sparse sector file at `path`
    pub fn write_to(&self, path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = File::create(path).unwrap();
        file.set_len(MAP_SIZE).unwrap();
        for (pos, ptr) in &self.pointers {
            file.seek(SeekFrom::Start(*pos)).unwrap();
            file.write_uint::<LittleEndian>(*ptr, PTR_LN).unwrap();
        }
        file.seek(SeekFrom::Start(MAP_SIZE)).unwrap();
        file.write_all(&self.nodes).unwrap();
    }
}

/// Writer that fails every write
#[derive(Debug)]
pub struct BrokenSink;

impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory store that counts how it is used
///
/// Chains are kept per short key. Loaded sectors carry one byte per slot
/// (non-zero = populated) so that `has_pointer` stays cheap during scans.
#[derive(Default)]
pub struct StubStore {
    chains: HashMap<[u8; 4], Vec<Vec<u8>>>,
    failing: BTreeSet<u8>,
    pub loads: Cell<usize>,
    pub opens: Cell<usize>,
    pub node_reads: Cell<usize>,
    pub read_keys: RefCell<Vec<Vec<u8>>>,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a chain of raw nodes under the short key of `key`
    pub fn with_chain(mut self, key: &[u8], nodes: Vec<Vec<u8>>) -> Self {
        let mut short = [0u8; 4];
        short.copy_from_slice(&key[..4]);
        self.chains.insert(short, nodes);
        self
    }

    /// Make loading the sector for `k0` fail
    pub fn with_failing_sector(mut self, k0: u8) -> Self {
        self.failing.insert(k0);
        self
    }

    fn has_sector(&self, k0: u8) -> bool {
        self.chains.keys().any(|key| key[0] == k0)
    }

    fn node_at(&self, next: u64, key: &[u8]) -> LdbResult<Node<'_>> {
        self.node_reads.set(self.node_reads.get() + 1);
        self.read_keys.borrow_mut().push(key.to_vec());

        let mut short = [0u8; 4];
        short.copy_from_slice(short_key(key)?);
        let chain = match self.chains.get(&short) {
            Some(chain) => chain,
            None => return Ok(Node::empty()),
        };

        let index = next as usize;
        let data = chain
            .get(index)
            .ok_or_else(|| LdbError::malformed(next, "no such node"))?;
        let next = if index + 1 < chain.len() {
            (index + 1) as u64
        } else {
            0
        };
        Ok(Node {
            data,
            next,
            offset: index as u64,
        })
    }
}

impl SectorStore for StubStore {
    type Handle = ();

    fn load_sector(&self, _table: &Table, k0: u8) -> LdbResult<Option<Sector>> {
        self.loads.set(self.loads.get() + 1);
        if self.failing.contains(&k0) {
            return Err(LdbError::Io(io::Error::new(io::ErrorKind::Other, "bad sector")));
        }
        if !self.has_sector(k0) {
            return Ok(None);
        }

        let mut slots = vec![0u8; SLOTS_PER_SECTOR as usize];
        for key in self.chains.keys().filter(|key| key[0] == k0) {
            slots[slot_index(key)? as usize] = 1;
        }
        Ok(Some(Sector::new(k0, slots)))
    }

    fn open(&self, _table: &Table, key: &[u8]) -> LdbResult<()> {
        self.opens.set(self.opens.get() + 1);
        let k0 = short_key(key)?[0];
        if self.has_sector(k0) {
            Ok(())
        } else {
            Err(LdbError::Io(io::Error::new(io::ErrorKind::NotFound, "no sector")))
        }
    }

    fn read_sector_node<'a>(
        &'a self,
        _sector: &'a Sector,
        _table: &Table,
        next: u64,
        key: &[u8],
    ) -> LdbResult<Node<'a>> {
        self.node_at(next, key)
    }

    fn read_file_node<'a>(
        &'a self,
        _handle: &mut (),
        _table: &Table,
        next: u64,
        key: &[u8],
        _scratch: &'a mut Vec<u8>,
    ) -> LdbResult<Node<'a>> {
        self.node_at(next, key)
    }

    fn has_pointer(&self, sector: &Sector, key: &[u8]) -> bool {
        match slot_index(key) {
            Ok(slot) => sector.as_bytes()[slot as usize] != 0,
            Err(_) => false,
        }
    }
}
