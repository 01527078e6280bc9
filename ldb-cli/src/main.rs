//! LDB command-line front end
//!
//! Reads records from LDB tables and dumps whole tables as CSV.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ldb_engine::operations::{CsvPrinter, Record};
use ldb_engine::storage::key::{parse_hex, subkey, to_hex};
use ldb_engine::{Ldb, LdbConfig, RecordVisitor};

/// LDB - read and dump sector-mapped key/value tables
#[derive(Parser, Debug)]
#[command(name = "ldb")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data root holding <db>/<table> directories
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every record of a table as CSV
    Dump {
        /// Table as db/table
        table: String,

        /// Leading record bytes to print as hex
        #[arg(long)]
        hex: Option<usize>,
    },

    /// Print the records stored under a key
    Fetch {
        /// Table as db/table
        table: String,

        /// Key in hex
        key: String,

        /// Visit every dataset instead of only the key's subkey
        #[arg(short, long)]
        all_subkeys: bool,

        /// Leading record bytes to print as hex
        #[arg(long)]
        hex: Option<usize>,
    },

    /// Print the first non-empty record of a key
    Get {
        /// Table as db/table
        table: String,

        /// Key in hex
        key: String,
    },

    /// Check whether a key has any record
    Exists {
        /// Table as db/table
        table: String,

        /// Key in hex
        key: String,
    },

    /// Show a table descriptor
    Info {
        /// Table as db/table
        table: String,
    },
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => LdbConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LdbConfig::default(),
    };
    if let Some(root) = args.root {
        config.root = root;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    // Logs go to stderr so dumps stay clean on stdout
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&config.log_level))
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let ldb = Ldb::new(&config);
    let stdout = io::stdout();

    match args.command {
        Command::Dump { table, hex } => {
            let table = ldb.table(&table)?;
            info!("Dumping {} from {}", table, config.root.display());
            ldb.dump(&table, hex.unwrap_or(config.hex_bytes), stdout.lock())?;
        }

        Command::Fetch {
            table,
            key,
            all_subkeys,
            hex,
        } => {
            let table = ldb.table(&table)?;
            let key = parse_hex(&key)?;

            let mut printer =
                CsvPrinter::new(BufWriter::new(stdout.lock()), hex.unwrap_or(config.hex_bytes));
            let records = ldb.fetch(&table, &key, all_subkeys, &mut printer)?;
            let _out = printer.finish()?;

            info!("{} records under {}", records, to_hex(&key));
            if records == 0 {
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Get { table, key } => {
            let table = ldb.table(&table)?;
            let key = parse_hex(&key)?;

            let Some(data) = ldb.first_record(&table, &key)? else {
                info!("No record under {}", to_hex(&key));
                return Ok(ExitCode::FAILURE);
            };

            let record = Record {
                key: &key,
                subkey: if table.is_fixed() {
                    None
                } else {
                    subkey(&key, table.subkey_ln())
                },
                data: &data,
                index: 0,
            };
            let mut printer = CsvPrinter::new(stdout.lock(), config.hex_bytes);
            let _ = printer.visit(&record);
            let _out = printer.finish()?;
        }

        Command::Exists { table, key } => {
            let table = ldb.table(&table)?;
            let key = parse_hex(&key)?;

            let exists = ldb.key_exists(&table, &key)?;
            let mut out = stdout.lock();
            writeln!(out, "{}", exists)?;
            out.flush()?;
            if !exists {
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Info { table } => {
            let table = ldb.table(&table)?;
            let sectors = (0..=u8::MAX)
                .filter(|&k0| ldb.store.sector_path(&table, k0).is_file())
                .count();

            let mut out = stdout.lock();
            writeln!(out, "{}", table)?;
            writeln!(out, "directory: {}", ldb.store.table_dir(&table.db, &table.name).display())?;
            writeln!(out, "sectors:   {}", sectors)?;
            out.flush()?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
