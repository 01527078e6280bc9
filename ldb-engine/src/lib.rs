//! LDB Engine - read path for the LDB sector-mapped key/value store
//!
//! This crate walks the node chains stored behind each short key of an LDB
//! table and hands the decoded records to caller-supplied visitors.

pub mod config;
pub mod error;
pub mod file_manager;
pub mod operations;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::LdbConfig;
pub use error::{LdbError, LdbResult};
pub use operations::{Ldb, Record, RecordVisitor};
