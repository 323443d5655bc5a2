//! Tally keeps a running total of monetary amounts against a fixed limit.
//!
//! Amounts (optionally dated) are appended to a local SQLite database.
//! The total, progress towards the limit, colour tier and near-limit warning
//! are derived from the stored records every time they are read, so they
//! can never drift from the data.
//!
//! The [RecordStore] trait is the interface for presentation layers; use
//! [SQLiteRecordStore] for durable storage or [InMemoryRecordStore] where
//! nothing needs to be persisted.

#![warn(missing_docs)]

mod config;
mod db;
mod error;
mod format;
mod logging;
mod progress;
mod record;

pub mod stores;

pub use config::{Config, DEFAULT_CURRENCY_SYMBOL, DEFAULT_DB_PATH, StoreConfig, StoreLocation};
pub use db::{SCHEMA_VERSION, initialize as initialize_db};
pub use error::Error;
pub use format::{CurrencyFormatter, format_date, format_entry, render_bar};
pub use logging::{DEFAULT_LOG_FILTER, setup_logging};
pub use progress::{
    DEFAULT_LIMIT, DEFAULT_WARNING_BAND, Limit, NearLimitMonitor, ProgressConfig, Summary, Tier,
    TierPolicy, WarningChange,
};
pub use record::{Amount, DateMode, Record, RecordId, parse_date, sum_amounts};
pub use stores::{InMemoryRecordStore, RecordStore, SQLiteRecordStore, StoreEvent};
