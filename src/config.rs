//! Configuration for the record store and the derived progress views.

use std::{fmt::Display, path::PathBuf};

use crate::{progress::ProgressConfig, record::DateMode};

/// The database file used when no path is given.
pub const DEFAULT_DB_PATH: &str = "valores.db";

/// The currency symbol used when formatting amounts.
pub const DEFAULT_CURRENCY_SYMBOL: &str = "R$";

/// Where a [SQLiteRecordStore](crate::stores::SQLiteRecordStore) keeps its
/// records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// A database file on disk.
    File(PathBuf),
    /// A private in-memory database that disappears with its connection.
    Memory,
}

impl Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreLocation::File(path) => write!(f, "{}", path.display()),
            StoreLocation::Memory => write!(f, ":memory:"),
        }
    }
}

/// The config for opening a record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Where the records are kept.
    pub location: StoreLocation,
    /// Whether records carry dates.
    pub date_mode: DateMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: StoreLocation::File(PathBuf::from(DEFAULT_DB_PATH)),
            date_mode: DateMode::default(),
        }
    }
}

/// Everything the presentation layer needs to open a store and render it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// How to open the record store.
    pub store: StoreConfig,
    /// The limit and thresholds the total is measured against.
    pub progress: ProgressConfig,
    /// The symbol prefixed to formatted amounts.
    pub currency_symbol: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            progress: ProgressConfig::default(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_owned(),
        }
    }
}
