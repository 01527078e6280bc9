//! Record traversal operations
//!
//! Recordset fetching, first-record access, key existence checks and
//! full keyspace scans.

pub mod dump;
pub mod engine;
pub mod recordset;
pub mod visitor;

pub use dump::{dump, scan_all, ScanSummary};
pub use engine::Ldb;
pub use recordset::{fetch_recordset, get_first_record, key_exists};
pub use visitor::{CsvPrinter, FirstRecord, KeyProbe, Record, RecordVisitor};
