//! Table descriptors
//!
//! A table is described by its total key length and, for fixed-size
//! tables, the record length. The record layout is decided once when the
//! descriptor is built and drives how every node of the table is decoded.

use std::fmt;

use serde::Deserialize;

use super::key::KEY_LN;
use crate::error::{LdbError, LdbResult};

/// Largest record the engine will hand to a visitor, plus framing
pub const MAX_REC_LN: usize = 65535;

/// Records whose length plus this margin reaches `MAX_REC_LN` are dropped
pub const RECORD_SAFETY_MARGIN: usize = 32;

/// Table settings as stored in `table.toml`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TableConfig {
    /// Total key length (short key + subkey)
    pub key_ln: u8,
    /// Fixed record length, 0 for variable-length records
    #[serde(default)]
    pub rec_ln: u16,
}

impl TableConfig {
    /// Parse a table configuration from TOML text
    pub fn from_toml_str(text: &str) -> LdbResult<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// How records are laid out inside the nodes of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// Each node is exactly one record
    Fixed { rec_ln: u16 },
    /// Nodes hold subkey-tagged datasets of length-prefixed records
    Variable { subkey_ln: u8 },
}

/// Descriptor of an open table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Database name
    pub db: String,
    /// Table name
    pub name: String,
    /// Total key length
    pub key_ln: u8,
    /// Record layout
    pub layout: RecordLayout,
}

impl Table {
    /// Build a descriptor, validating the key length
    pub fn new(db: &str, name: &str, config: TableConfig) -> LdbResult<Self> {
        if (config.key_ln as usize) < KEY_LN {
            return Err(LdbError::InvalidConfig(format!(
                "{}/{}: key_ln {} is shorter than the {}-byte short key",
                db, name, config.key_ln, KEY_LN
            )));
        }

        let layout = if config.rec_ln > 0 {
            RecordLayout::Fixed {
                rec_ln: config.rec_ln,
            }
        } else {
            RecordLayout::Variable {
                subkey_ln: config.key_ln - KEY_LN as u8,
            }
        };

        Ok(Table {
            db: db.to_string(),
            name: name.to_string(),
            key_ln: config.key_ln,
            layout,
        })
    }

    /// Length of the subkey part of a full key
    pub fn subkey_ln(&self) -> usize {
        self.key_ln as usize - KEY_LN
    }

    /// Check for fixed-length records
    pub fn is_fixed(&self) -> bool {
        matches!(self.layout, RecordLayout::Fixed { .. })
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} (key_ln={}, ", self.db, self.name, self.key_ln)?;
        match self.layout {
            RecordLayout::Fixed { rec_ln } => write!(f, "fixed rec_ln={})", rec_ln),
            RecordLayout::Variable { subkey_ln } => {
                write!(f, "variable subkey_ln={})", subkey_ln)
            }
        }
    }
}
