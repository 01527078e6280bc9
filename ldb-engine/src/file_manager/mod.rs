//! File manager for LDB tables
//!
//! Manages sector file access and table descriptor lookup.

pub mod catalog;
pub mod disk;
pub mod store;

pub use catalog::{CatalogStats, TableCatalog};
pub use disk::DiskStore;
pub use store::SectorStore;
