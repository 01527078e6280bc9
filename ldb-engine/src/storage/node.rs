//! Node framing for LDB data chains
//!
//! A key's data is a singly linked chain of nodes. In variable-length
//! tables each node is a sequence of datasets:
//!
//! ```text
//! subkey (subkey_ln) | dataset_size (u16 LE) | dataset_size bytes
//! ```
//!
//! and each dataset payload is a sequence of records:
//!
//! ```text
//! record_size (u16 LE) | record_size bytes
//! ```
//!
//! All reads go through `FrameCursor`, which never reads past the end of
//! the node it was built over.

use byteorder::{ByteOrder, LittleEndian};

/// One node of a chain, borrowed from a sector or a scratch buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node<'a> {
    /// Node payload
    pub data: &'a [u8],
    /// Continuation token of the next node, 0 at the end of the chain
    pub next: u64,
    /// Token this node was read from
    pub offset: u64,
}

impl<'a> Node<'a> {
    /// A read that found nothing
    pub const fn empty() -> Self {
        Node {
            data: &[],
            next: 0,
            offset: 0,
        }
    }

    /// Check if this read reached the end of the chain without data
    pub fn is_end(&self) -> bool {
        self.data.is_empty() && self.next == 0
    }
}

/// Bounds-checked forward cursor over a byte slice
#[derive(Debug, Clone)]
pub struct FrameCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FrameCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        FrameCursor { buf, pos: 0 }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Take the next `n` bytes, or nothing if fewer are left
    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        self.take(2).map(LittleEndian::read_u16)
    }
}

/// A subkey-tagged group of records inside a variable-length node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dataset<'a> {
    pub subkey: &'a [u8],
    pub payload: &'a [u8],
}

impl<'a> Dataset<'a> {
    /// Iterate the records of this dataset
    pub fn records(&self) -> Records<'a> {
        Records {
            cursor: FrameCursor::new(self.payload),
        }
    }
}

/// Iterator over the datasets of a node
///
/// Stops at the first dataset that does not fit in the node.
#[derive(Debug, Clone)]
pub struct Datasets<'a> {
    cursor: FrameCursor<'a>,
    subkey_ln: usize,
}

impl<'a> Iterator for Datasets<'a> {
    type Item = Dataset<'a>;

    fn next(&mut self) -> Option<Dataset<'a>> {
        if self.cursor.is_at_end() {
            return None;
        }
        let parsed = (|| {
            let subkey = self.cursor.take(self.subkey_ln)?;
            let size = self.cursor.read_u16()? as usize;
            let payload = self.cursor.take(size)?;
            Some(Dataset { subkey, payload })
        })();
        if parsed.is_none() {
            // Fuse on truncated input
            self.cursor = FrameCursor::new(&[]);
        }
        parsed
    }
}

/// Iterator over the records of a dataset
#[derive(Debug, Clone)]
pub struct Records<'a> {
    cursor: FrameCursor<'a>,
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.cursor.is_at_end() {
            return None;
        }
        let parsed = self
            .cursor
            .read_u16()
            .and_then(|size| self.cursor.take(size as usize));
        if parsed.is_none() {
            self.cursor = FrameCursor::new(&[]);
        }
        parsed
    }
}

/// Iterate the datasets of a variable-length node
pub fn datasets(data: &[u8], subkey_ln: usize) -> Datasets<'_> {
    Datasets {
        cursor: FrameCursor::new(data),
        subkey_ln,
    }
}

/// Check that a variable-length node is framed consistently
///
/// Every dataset header and payload must fit inside the node, and the
/// records of every dataset must tile its payload exactly.
pub fn validate_node(data: &[u8], subkey_ln: usize) -> bool {
    let mut cursor = FrameCursor::new(data);

    while !cursor.is_at_end() {
        if cursor.take(subkey_ln).is_none() {
            return false;
        }
        let payload = match cursor.read_u16().and_then(|size| cursor.take(size as usize)) {
            Some(payload) => payload,
            None => return false,
        };

        let mut records = FrameCursor::new(payload);
        while !records.is_at_end() {
            let fits = records
                .read_u16()
                .and_then(|size| records.take(size as usize))
                .is_some();
            if !fits {
                return false;
            }
        }
    }

    true
}
