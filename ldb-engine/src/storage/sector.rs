//! Sector files and their in-memory images
//!
//! A sector holds all data whose key starts with the same byte. The file
//! starts with a map of 256^3 five-byte pointers, one per short-key slot,
//! each pointing at the first node of that slot's chain (0 = no data).
//! Nodes follow the map:
//!
//! ```text
//! next (5 bytes LE) | size (u32 LE) | size bytes of payload
//! ```

use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use super::key::{slot_index, SLOTS_PER_SECTOR};
use super::node::Node;
use crate::error::{LdbError, LdbResult};

/// Width of an on-disk pointer
pub const PTR_LN: usize = 5;

/// Size of the pointer map at the start of every sector file
pub const MAP_SIZE: u64 = SLOTS_PER_SECTOR as u64 * PTR_LN as u64;

/// Node header: next pointer plus payload size
pub const NODE_HEADER_LN: usize = PTR_LN + 4;

/// Largest node payload accepted from disk
pub const MAX_NODE_LN: usize = 256 * 256 * 18 - 1;

/// File name of the sector for first key byte `k0`
pub fn sector_file_name(k0: u8) -> String {
    format!("{:02x}.ldb", k0)
}

/// Offset of the map entry for `key`
pub fn map_pointer_pos(key: &[u8]) -> LdbResult<u64> {
    Ok(slot_index(key)? as u64 * PTR_LN as u64)
}

/// Decode a 5-byte little-endian pointer
pub fn read_ptr(buf: &[u8]) -> u64 {
    LittleEndian::read_uint(buf, PTR_LN)
}

/// Decoded node header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader {
    pub next: u64,
    pub size: usize,
}

impl NodeHeader {
    /// Read and sanity-check the header of the node stored at `offset`
    pub fn read_from<R: Read>(reader: &mut R, offset: u64) -> LdbResult<Self> {
        let eof = |e: io::Error| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                LdbError::malformed(offset, "node header truncated")
            } else {
                LdbError::Io(e)
            }
        };
        let next = reader.read_uint::<LittleEndian>(PTR_LN).map_err(eof)?;
        let size = reader.read_u32::<LittleEndian>().map_err(eof)? as usize;

        if size > MAX_NODE_LN {
            return Err(LdbError::malformed(
                offset,
                format!("node size {} exceeds {}", size, MAX_NODE_LN),
            ));
        }
        if next != 0 && next < MAP_SIZE {
            return Err(LdbError::malformed(
                offset,
                format!("next pointer {} points into the map", next),
            ));
        }

        Ok(NodeHeader { next, size })
    }

    /// Parse a header from the start of `buf`
    pub fn parse(buf: &[u8], offset: u64) -> LdbResult<Self> {
        Self::read_from(&mut &buf[..], offset)
    }
}

/// Complete in-memory image of one sector file
#[derive(Clone)]
pub struct Sector {
    k0: u8,
    data: Vec<u8>,
}

impl Sector {
    /// Wrap a sector image loaded for first key byte `k0`
    pub fn new(k0: u8, data: Vec<u8>) -> Self {
        Sector { k0, data }
    }

    /// Raw sector bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pointer to the first node for `key`, 0 if the slot is empty
    pub fn list_pointer(&self, key: &[u8]) -> LdbResult<u64> {
        let pos = map_pointer_pos(key)? as usize;
        Ok(self
            .data
            .get(pos..pos + PTR_LN)
            .map(read_ptr)
            .unwrap_or(0))
    }

    /// Existence index: does the map hold a pointer for `key`
    pub fn has_pointer(&self, key: &[u8]) -> bool {
        matches!(self.list_pointer(key), Ok(ptr) if ptr != 0)
    }

    /// Read the node at `next`, or the first node of `key`'s chain if
    /// `next` is 0
    pub fn read_node(&self, next: u64, key: &[u8]) -> LdbResult<Node<'_>> {
        let offset = if next == 0 {
            match self.list_pointer(key)? {
                0 => return Ok(Node::empty()),
                ptr => ptr,
            }
        } else {
            next
        };

        if offset < MAP_SIZE {
            return Err(LdbError::malformed(offset, "node pointer inside the map"));
        }

        let start = usize::try_from(offset)
            .map_err(|_| LdbError::malformed(offset, "node pointer out of range"))?;
        let header_bytes = self
            .data
            .get(start..)
            .ok_or_else(|| LdbError::malformed(offset, "node pointer past end of sector"))?;
        let header = NodeHeader::parse(header_bytes, offset)?;

        let body = start + NODE_HEADER_LN;
        let data = self
            .data
            .get(body..body + header.size)
            .ok_or_else(|| LdbError::malformed(offset, "node runs past end of sector"))?;

        Ok(Node {
            data,
            next: header.next,
            offset,
        })
    }
}

impl std::fmt::Debug for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sector")
            .field("k0", &self.k0)
            .field("len", &self.data.len())
            .finish()
    }
}
