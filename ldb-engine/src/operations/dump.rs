//! Keyspace scanner: enumerate every record of a table
//!
//! Each of the 256 sectors is loaded once. Every short-key slot whose map
//! entry is populated is then fetched from memory with subkey filtering
//! disabled, in ascending key order.

use std::io::{BufWriter, Write};

use crate::error::LdbResult;
use crate::file_manager::store::SectorStore;
use crate::storage::key::{short_key_from_slot, SLOTS_PER_SECTOR};
use crate::storage::table::Table;

use super::recordset::fetch_recordset;
use super::visitor::{CsvPrinter, RecordVisitor};

/// Totals gathered by a scan
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Sectors that were loaded
    pub sectors: u32,
    /// Populated short keys that were fetched
    pub keys: u64,
    /// Records delivered to the visitor
    pub records: u64,
}

/// Visit every record of `table`
///
/// Missing sectors hold no data. A sector that fails to load is logged
/// and skipped. The scan covers all 256 prefixes unless the visitor
/// halts.
pub fn scan_all<S, V>(store: &S, table: &Table, visitor: &mut V) -> ScanSummary
where
    S: SectorStore,
    V: RecordVisitor + ?Sized,
{
    let mut summary = ScanSummary::default();

    'sectors: for k0 in 0..=u8::MAX {
        let sector = match store.load_sector(table, k0) {
            Ok(Some(sector)) => sector,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(
                    "Skipping sector {:02x} of {}/{}: {}",
                    k0,
                    table.db,
                    table.name,
                    e
                );
                continue;
            }
        };
        summary.sectors += 1;

        for slot in 0..SLOTS_PER_SECTOR {
            let key = short_key_from_slot(k0, slot);
            if store.has_pointer(&sector, &key) {
                summary.keys += 1;
                summary.records +=
                    fetch_recordset(store, Some(&sector), table, &key, true, visitor) as u64;
                if visitor.halted() {
                    tracing::warn!(
                        "Scan of {}/{} halted by visitor in sector {:02x}",
                        table.db,
                        table.name,
                        k0
                    );
                    break 'sectors;
                }
            }
        }

        tracing::debug!(
            "Sector {:02x} of {}/{} done, {} records so far",
            k0,
            table.db,
            table.name,
            summary.records
        );
    }

    summary
}

/// Write every record of `table` to `out` as CSV lines
///
/// Output is buffered and flushed once the scan completes.
pub fn dump<S, W>(store: &S, table: &Table, hex_bytes: usize, out: W) -> LdbResult<ScanSummary>
where
    S: SectorStore,
    W: Write,
{
    let mut printer = CsvPrinter::new(BufWriter::new(out), hex_bytes);
    let summary = scan_all(store, table, &mut printer);
    printer.finish()?;

    tracing::info!(
        "Dumped {} records under {} keys from {} sectors of {}/{}",
        summary.records,
        summary.keys,
        summary.sectors,
        table.db,
        table.name
    );
    Ok(summary)
}
