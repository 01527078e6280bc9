//! Storage layer for the LDB sector format
//!
//! This module handles the low-level binary format of LDB tables:
//! - Key layout and short-key slots
//! - Table descriptors and record layouts
//! - Sector maps and node headers
//! - Dataset and record framing inside nodes

pub mod key;
pub mod node;
pub mod sector;
pub mod table;

pub use key::{KEY_LN, SLOTS_PER_SECTOR};
pub use node::{Dataset, Node};
pub use sector::{NodeHeader, Sector, MAP_SIZE, PTR_LN};
pub use table::{RecordLayout, Table, TableConfig, MAX_REC_LN};
