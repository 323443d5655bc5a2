//! Creates, upgrades and removes the database schema for the record store.

use rusqlite::{Connection, Row, Transaction, TransactionBehavior};

use crate::{Error, record::Record};

/// The schema version written to `PRAGMA user_version` by [initialize].
///
/// Version 1 holds the record table, version 2 adds secondary indexes on the
/// amount and date columns.
pub const SCHEMA_VERSION: i64 = 2;

/// Ensure the schema exists and is at [SCHEMA_VERSION].
///
/// Safe to call on every open: each upgrade step runs at most once.
///
/// # Errors
/// Returns an [Error::StorageUnavailable] if the database was written by a
/// newer schema version, or an [Error::SqlError] if an upgrade fails.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let version = schema_version(&transaction)?;

    if version > SCHEMA_VERSION {
        return Err(Error::StorageUnavailable(format!(
            "database schema version {version} is newer than the supported version {SCHEMA_VERSION}"
        )));
    }

    if version < 1 {
        create_record_table(&transaction)?;
    }

    if version < 2 {
        create_record_indexes(&transaction)?;
    }

    if version < SCHEMA_VERSION {
        set_schema_version(&transaction, SCHEMA_VERSION)?;
        tracing::info!("upgraded database schema from version {version} to {SCHEMA_VERSION}");
    }

    transaction.commit()?;

    Ok(())
}

/// Remove the record table, its indexes and its key sequence, and reset the
/// schema version so that the next [initialize] starts from scratch.
pub fn drop_schema(connection: &Connection) -> Result<(), Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    transaction.execute_batch("DROP TABLE IF EXISTS record;")?;
    set_schema_version(&transaction, 0)?;

    transaction.commit()?;

    Ok(())
}

/// Read the schema version stored in the database.
pub fn schema_version(connection: &Connection) -> Result<i64, rusqlite::Error> {
    connection.query_row("PRAGMA user_version;", [], |row| row.get(0))
}

fn set_schema_version(connection: &Connection, version: i64) -> Result<(), rusqlite::Error> {
    // PRAGMA does not accept bound parameters.
    connection.execute_batch(&format!("PRAGMA user_version = {version};"))
}

fn create_record_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS record (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount REAL NOT NULL,
            date TEXT
        )",
        (),
    )?;

    Ok(())
}

fn create_record_indexes(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_record_amount ON record(amount);
        CREATE INDEX IF NOT EXISTS idx_record_date ON record(date);",
    )
}

/// Map a row selected as `id, amount, date` to a [Record].
pub fn map_record_row(row: &Row) -> Result<Record, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let date = row.get(2)?;

    Ok(Record { id, amount, date })
}
