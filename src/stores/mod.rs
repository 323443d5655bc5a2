//! Contains the record store trait and its implementations.

mod memory;
mod record;

pub mod sqlite;

pub use memory::InMemoryRecordStore;
pub use record::{EVENT_CAPACITY, RecordStore, StoreEvent};
pub use sqlite::SQLiteRecordStore;
