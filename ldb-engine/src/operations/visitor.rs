//! Record visitors
//!
//! The fetcher hands every record it decodes to a `RecordVisitor`. The only
//! thing a visitor can tell the fetcher is whether to keep going; any other
//! state (captured data, write errors) lives in the visitor itself.

use std::io::{self, Write};
use std::ops::ControlFlow;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::storage::key::{to_hex, KEY_LN};

/// A record borrowed from the node it was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    /// Key the fetch was issued for
    pub key: &'a [u8],
    /// Dataset subkey, `None` for fixed-length tables
    pub subkey: Option<&'a [u8]>,
    /// Record payload
    pub data: &'a [u8],
    /// Zero-based position among the records delivered by this fetch
    pub index: u32,
}

/// Receives records from the fetcher
pub trait RecordVisitor {
    /// Handle one record; `Break` stops the fetch
    fn visit(&mut self, record: &Record<'_>) -> ControlFlow<()>;

    /// Whether the visitor will refuse every further record
    ///
    /// Scans stop once this is set.
    fn halted(&self) -> bool {
        false
    }
}

impl<F> RecordVisitor for F
where
    F: FnMut(&Record<'_>) -> ControlFlow<()>,
{
    fn visit(&mut self, record: &Record<'_>) -> ControlFlow<()> {
        self(record)
    }
}

/// Captures the first non-empty record as `u32 LE length | bytes`
#[derive(Debug)]
pub struct FirstRecord<'a> {
    out: &'a mut Vec<u8>,
    found: bool,
}

impl<'a> FirstRecord<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        FirstRecord { out, found: false }
    }

    /// Whether a record was captured
    pub fn found(&self) -> bool {
        self.found
    }
}

impl RecordVisitor for FirstRecord<'_> {
    fn visit(&mut self, record: &Record<'_>) -> ControlFlow<()> {
        if record.data.is_empty() {
            return ControlFlow::Continue(());
        }

        self.out.clear();
        self.out.reserve(4 + record.data.len());
        // Writing into a Vec cannot fail
        let _ = self.out.write_u32::<LittleEndian>(record.data.len() as u32);
        self.out.extend_from_slice(record.data);
        self.found = true;
        ControlFlow::Break(())
    }
}

/// Stops on the first record it sees
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyProbe;

impl RecordVisitor for KeyProbe {
    fn visit(&mut self, _record: &Record<'_>) -> ControlFlow<()> {
        ControlFlow::Break(())
    }
}

/// Prints records as CSV lines
///
/// Each line is the short key and subkey in hex, then optionally the first
/// `hex_bytes` bytes of the record in hex, then the rest of the record as
/// text with non-printable bytes shown as `.`.
pub struct CsvPrinter<W: Write> {
    out: W,
    hex_bytes: usize,
    lines: u64,
    error: Option<io::Error>,
}

impl<W: Write> CsvPrinter<W> {
    pub fn new(out: W, hex_bytes: usize) -> Self {
        CsvPrinter {
            out,
            hex_bytes,
            lines: 0,
            error: None,
        }
    }

    /// Number of lines written so far
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Flush the sink and hand it back, reporting the first write error
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_line(&mut self, record: &Record<'_>) -> io::Result<()> {
        let short = record.key.get(..KEY_LN).unwrap_or(record.key);
        let subkey = record.subkey.unwrap_or(&[]);
        write!(self.out, "{}{},", to_hex(short), to_hex(subkey))?;

        let split = self.hex_bytes.min(record.data.len());
        let (hex, text) = record.data.split_at(split);
        if self.hex_bytes > 0 {
            write!(self.out, "{},", to_hex(hex))?;
        }

        let printable: Vec<u8> = text
            .iter()
            .map(|&b| if (0x20..0x7f).contains(&b) { b } else { b'.' })
            .collect();
        self.out.write_all(&printable)?;
        self.out.write_all(b"\n")
    }
}

impl<W: Write> RecordVisitor for CsvPrinter<W> {
    fn visit(&mut self, record: &Record<'_>) -> ControlFlow<()> {
        if self.halted() {
            return ControlFlow::Break(());
        }
        match self.write_line(record) {
            Ok(()) => {
                self.lines += 1;
                ControlFlow::Continue(())
            }
            Err(err) => {
                self.error = Some(err);
                ControlFlow::Break(())
            }
        }
    }

    /// Set after the first write error
    fn halted(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::BrokenSink;

    fn record<'a>(subkey: Option<&'a [u8]>, data: &'a [u8]) -> Record<'a> {
        Record {
            key: &[0x01, 0x02, 0x03, 0x04, 0xaa, 0xbb],
            subkey,
            data,
            index: 0,
        }
    }

    #[test]
    fn test_first_record_captures_and_stops() {
        let mut out = Vec::new();
        let mut visitor = FirstRecord::new(&mut out);
        assert_eq!(visitor.visit(&record(None, b"hello")), ControlFlow::Break(()));
        assert!(visitor.found());
        assert_eq!(out, [5, 0, 0, 0, b'h', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn test_first_record_skips_empty() {
        let mut out = vec![9, 9];
        let mut visitor = FirstRecord::new(&mut out);
        assert_eq!(visitor.visit(&record(None, b"")), ControlFlow::Continue(()));
        assert!(!visitor.found());
        assert_eq!(out, vec![9, 9]);
    }

    #[test]
    fn test_key_probe_always_stops() {
        assert_eq!(KeyProbe.visit(&record(None, b"")), ControlFlow::Break(()));
    }

    #[test]
    fn test_closure_visitor() {
        let mut seen = Vec::new();
        let mut visitor = |r: &Record<'_>| {
            seen.push(r.data.to_vec());
            ControlFlow::Continue(())
        };
        assert_eq!(visitor.visit(&record(None, b"x")), ControlFlow::Continue(()));
        assert_eq!(seen, vec![b"x".to_vec()]);
    }

    #[test]
    fn test_csv_text_only() {
        let mut printer = CsvPrinter::new(Vec::new(), 0);
        let subkey: &[u8] = &[0xaa, 0xbb];
        assert_eq!(printer.visit(&record(Some(subkey), b"hi\tthere")), ControlFlow::Continue(()));
        assert_eq!(printer.lines(), 1);
        let out = printer.finish().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "01020304aabb,hi.there\n");
    }

    #[test]
    fn test_csv_hex_prefix() {
        let mut printer = CsvPrinter::new(Vec::new(), 2);
        let _ = printer.visit(&record(None, &[0xde, 0xad, b'o', b'k']));
        let _ = printer.visit(&record(None, &[0x01]));
        let out = printer.finish().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "01020304,dead,ok\n01020304,01,\n"
        );
    }

    #[test]
    fn test_csv_write_error_stops_and_is_reported() {
        let mut printer = CsvPrinter::new(BrokenSink, 0);
        assert_eq!(printer.visit(&record(None, b"x")), ControlFlow::Break(()));
        assert_eq!(printer.visit(&record(None, b"y")), ControlFlow::Break(()));
        assert_eq!(printer.lines(), 0);
        assert!(printer.halted());
        assert_eq!(printer.finish().unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }
}
