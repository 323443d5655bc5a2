//! Implements a SQLite backed record store.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use time::Date;
use tokio::sync::broadcast;

use crate::{
    Error,
    config::{StoreConfig, StoreLocation},
    db::{drop_schema, initialize, map_record_row},
    record::{Amount, DateMode, Record},
    stores::{
        RecordStore,
        record::{EVENT_CAPACITY, StoreEvent},
        sqlite::{open_connection, remove_database_files},
    },
};

/// Stores records in a SQLite database.
///
/// Clones share the same connection, so mutations from any clone are
/// serialized and each one runs in its own transaction.
#[derive(Debug, Clone)]
pub struct SQLiteRecordStore {
    connection: Arc<Mutex<Connection>>,
    location: StoreLocation,
    date_mode: DateMode,
    events: broadcast::Sender<StoreEvent>,
}

impl SQLiteRecordStore {
    /// Open the store described by `config`, creating the database and its
    /// schema if they do not exist yet.
    ///
    /// Opening an existing store leaves its records untouched.
    ///
    /// # Errors
    /// Returns an [Error::StorageUnavailable] if the database cannot be
    /// created, opened or read.
    pub fn open(config: &StoreConfig) -> Result<Self, Error> {
        let connection = open_connection(&config.location)?;
        initialize(&connection)?;

        tracing::info!("opened record store at {}", config.location);

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            location: config.location.clone(),
            date_mode: config.date_mode,
            events,
        })
    }

    /// Where the store keeps its records.
    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|_| Error::DatabaseLock)
    }

    fn notify(&self, event: StoreEvent) {
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

impl RecordStore for SQLiteRecordStore {
    /// Insert a record and commit it before returning.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidInput] if `amount` is not finite or `date` is missing
    ///   when dates are required,
    /// - [Error::DatabaseLock] if the connection lock is poisoned,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn append(&mut self, amount: f64, date: Option<Date>) -> Result<Record, Error> {
        let amount = Amount::new(amount)?;
        let date = self.date_mode.apply(date)?;

        let record = {
            let connection = self.lock()?;
            let transaction =
                Transaction::new_unchecked(&connection, TransactionBehavior::Immediate)?;

            let record = transaction
                .prepare(
                    "INSERT INTO record (amount, date) VALUES (?1, ?2)
                     RETURNING id, amount, date",
                )?
                .query_row((amount.value(), date), map_record_row)?;

            transaction.commit()?;
            record
        };

        tracing::debug!("appended record {record:?}");
        self.notify(StoreEvent::Appended(record.clone()));

        Ok(record)
    }

    /// Retrieve all records ordered by ID, i.e. in insertion order.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] if there is a SQL error.
    fn list_all(&self) -> Result<Vec<Record>, Error> {
        self.lock()?
            .prepare("SELECT id, amount, date FROM record ORDER BY id ASC")?
            .query_map([], map_record_row)?
            .map(|maybe_record| maybe_record.map_err(|error| error.into()))
            .collect()
    }

    fn delete_latest(&mut self) -> Result<Option<Record>, Error> {
        let removed = {
            let connection = self.lock()?;
            let transaction =
                Transaction::new_unchecked(&connection, TransactionBehavior::Immediate)?;

            let removed = transaction
                .prepare(
                    "DELETE FROM record WHERE id = (SELECT MAX(id) FROM record)
                     RETURNING id, amount, date",
                )?
                .query_row([], map_record_row)
                .optional()?;

            transaction.commit()?;
            removed
        };

        match &removed {
            Some(record) => {
                tracing::debug!("deleted latest record {record:?}");
                self.notify(StoreEvent::DeletedLatest(record.clone()));
            }
            None => tracing::debug!("delete latest called on an empty store"),
        }

        Ok(removed)
    }

    fn clear(&mut self) -> Result<usize, Error> {
        let removed = {
            let connection = self.lock()?;
            let transaction =
                Transaction::new_unchecked(&connection, TransactionBehavior::Immediate)?;

            // AUTOINCREMENT keeps the key sequence in sqlite_sequence, so IDs
            // are not reused after this.
            let removed = transaction.execute("DELETE FROM record", ())?;

            transaction.commit()?;
            removed
        };

        tracing::debug!("cleared {removed} record(s)");
        self.notify(StoreEvent::Cleared);

        Ok(removed)
    }

    /// Drop the schema and, for a file backed store, delete the database file.
    ///
    /// The file is only deleted when no clone of this store is still alive,
    /// otherwise it is left in place with an empty schema.
    ///
    /// # Errors
    /// Returns an [Error::StorageUnavailable] if the database file cannot be
    /// removed.
    fn destroy(self) -> Result<(), Error> {
        let Self {
            connection,
            location,
            events,
            ..
        } = self;

        {
            let connection = connection.lock().map_err(|_| Error::DatabaseLock)?;
            drop_schema(&connection)?;
        }

        if let StoreLocation::File(path) = &location {
            match Arc::try_unwrap(connection) {
                Ok(mutex) => {
                    let connection = mutex.into_inner().map_err(|_| Error::DatabaseLock)?;
                    connection.close().map_err(|(_, error)| Error::from(error))?;
                    remove_database_files(path)?;
                }
                Err(_) => tracing::warn!(
                    "other handles to {path:?} are still open, leaving the file with an empty schema"
                ),
            }
        }

        tracing::info!("destroyed record store at {location}");
        let _ = events.send(StoreEvent::Destroyed);

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod sqlite_record_store_tests {
    use std::{fs, path::Path, thread};

    use time::macros::date;

    use crate::{
        Error,
        config::{StoreConfig, StoreLocation},
        record::DateMode,
        stores::{RecordStore, record::store_contract},
    };

    use super::SQLiteRecordStore;

    fn get_store() -> SQLiteRecordStore {
        SQLiteRecordStore::open(&StoreConfig {
            location: StoreLocation::Memory,
            date_mode: DateMode::Optional,
        })
        .expect("Could not open in-memory store")
    }

    fn file_config(path: &Path) -> StoreConfig {
        StoreConfig {
            location: StoreLocation::File(path.to_path_buf()),
            date_mode: DateMode::Optional,
        }
    }

    #[test]
    fn append_assigns_increasing_ids() {
        store_contract::append_assigns_increasing_ids(get_store());
    }

    #[test]
    fn total_is_sum_of_appended() {
        store_contract::total_is_sum_of_appended(get_store());
    }

    #[test]
    fn empty_store_has_zero_total() {
        store_contract::empty_store_has_zero_total(get_store());
    }

    #[test]
    fn list_all_preserves_insertion_order() {
        store_contract::list_all_preserves_insertion_order(get_store());
    }

    #[test]
    fn delete_latest_removes_last_appended() {
        store_contract::delete_latest_removes_last_appended(get_store());
    }

    #[test]
    fn delete_latest_on_empty_is_noop() {
        store_contract::delete_latest_on_empty_is_noop(get_store());
    }

    #[test]
    fn clear_removes_everything() {
        store_contract::clear_removes_everything(get_store());
    }

    #[test]
    fn clear_does_not_reuse_ids() {
        store_contract::clear_does_not_reuse_ids(get_store());
    }

    #[test]
    fn delete_latest_does_not_reuse_ids() {
        store_contract::delete_latest_does_not_reuse_ids(get_store());
    }

    #[test]
    fn invalid_amount_leaves_store_unchanged() {
        store_contract::invalid_amount_leaves_store_unchanged(get_store());
    }

    #[test]
    fn mutations_emit_events_after_commit() {
        store_contract::mutations_emit_events_after_commit(get_store());
    }

    #[test]
    fn destroy_emits_event() {
        store_contract::destroy_emits_event(get_store());
    }

    #[test]
    fn scenario_two_appends_then_delete_latest() {
        store_contract::scenario_two_appends_then_delete_latest(get_store());
    }

    #[test]
    fn records_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(&dir.path().join("valores.db"));
        let mut store = SQLiteRecordStore::open(&config).unwrap();
        store.append(150.0, Some(date!(2024 - 01 - 10))).unwrap();
        store.append(200.5, None).unwrap();
        let want = store.list_all().unwrap();
        drop(store);

        let reopened = SQLiteRecordStore::open(&config).unwrap();

        assert_eq!(reopened.list_all(), Ok(want));
        assert_eq!(reopened.total(), Ok(350.5));
    }

    #[test]
    fn open_twice_is_same_as_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(&dir.path().join("valores.db"));

        let first = SQLiteRecordStore::open(&config).unwrap();
        let second = SQLiteRecordStore::open(&config).unwrap();

        assert_eq!(first.list_all(), Ok(vec![]));
        assert_eq!(second.list_all(), Ok(vec![]));
        assert_eq!(second.total(), Ok(0.0));
    }

    #[test]
    fn destroy_then_open_yields_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("valores.db");
        let config = file_config(&path);
        let mut store = SQLiteRecordStore::open(&config).unwrap();
        let first_id = store.append(150.0, None).unwrap().id;
        store.append(200.5, None).unwrap();

        store.destroy().expect("Could not destroy store");

        assert!(!path.exists());

        let mut reopened = SQLiteRecordStore::open(&config).unwrap();
        assert_eq!(reopened.list_all(), Ok(vec![]));
        assert_eq!(reopened.total(), Ok(0.0));
        // A fresh store starts its key sequence from the beginning again.
        assert_eq!(reopened.append(1.0, None).unwrap().id, first_id);
    }

    #[test]
    fn destroy_in_memory_store_drops_schema() {
        let mut store = get_store();
        store.append(150.0, None).unwrap();
        let clone = store.clone();

        store.destroy().expect("Could not destroy store");

        assert!(matches!(clone.list_all(), Err(Error::SqlError(_))));
    }

    #[test]
    fn destroy_keeps_file_while_other_handles_are_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("valores.db");
        let store = SQLiteRecordStore::open(&file_config(&path)).unwrap();
        let clone = store.clone();

        store.destroy().expect("Could not destroy store");

        assert!(path.exists());
        drop(clone);
        let reopened = SQLiteRecordStore::open(&file_config(&path)).unwrap();
        assert_eq!(reopened.list_all(), Ok(vec![]));
    }

    #[test]
    fn open_fails_on_file_that_is_not_a_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        fs::write(&path, "this is not a database file. ".repeat(64)).unwrap();

        let store = SQLiteRecordStore::open(&file_config(&path));

        assert!(matches!(store, Err(Error::StorageUnavailable(_))));
    }

    #[test]
    fn open_fails_when_directory_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let store = SQLiteRecordStore::open(&file_config(&blocker.join("valores.db")));

        assert!(matches!(store, Err(Error::StorageUnavailable(_))));
    }

    #[test]
    fn required_date_mode_rejects_missing_date() {
        let mut store = SQLiteRecordStore::open(&StoreConfig {
            location: StoreLocation::Memory,
            date_mode: DateMode::Required,
        })
        .unwrap();

        let result = store.append(10.0, None);

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(store.list_all(), Ok(vec![]));
    }

    #[test]
    fn concurrent_appends_are_serialized() {
        let store = get_store();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mut store = store.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        store.append(1.0, None).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let records = store.list_all().unwrap();
        assert_eq!(records.len(), 100);
        assert_eq!(store.total(), Ok(100.0));
        assert!(records.windows(2).all(|pair| pair[0].id < pair[1].id));
    }
}
