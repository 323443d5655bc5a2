//! Implements a record store that keeps everything in memory.

use time::Date;
use tokio::sync::broadcast;

use crate::{
    Error,
    record::{Amount, DateMode, Record, RecordId},
    stores::{
        RecordStore,
        record::{EVENT_CAPACITY, StoreEvent},
    },
};

/// Stores records in a `Vec`.
///
/// Behaves like [SQLiteRecordStore](crate::stores::SQLiteRecordStore) without
/// persisting anything, which makes it a drop-in replacement in tests.
#[derive(Debug)]
pub struct InMemoryRecordStore {
    records: Vec<Record>,
    next_id: RecordId,
    date_mode: DateMode,
    events: broadcast::Sender<StoreEvent>,
}

impl InMemoryRecordStore {
    /// Create an empty store that applies `date_mode` to new records.
    pub fn new(date_mode: DateMode) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            records: Vec::new(),
            next_id: 1,
            date_mode,
            events,
        }
    }

    fn notify(&self, event: StoreEvent) {
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new(DateMode::default())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn append(&mut self, amount: f64, date: Option<Date>) -> Result<Record, Error> {
        let amount = Amount::new(amount)?;
        let date = self.date_mode.apply(date)?;

        let record = Record {
            id: self.next_id,
            amount: amount.value(),
            date,
        };
        self.next_id += 1;
        self.records.push(record.clone());

        self.notify(StoreEvent::Appended(record.clone()));

        Ok(record)
    }

    fn list_all(&self) -> Result<Vec<Record>, Error> {
        Ok(self.records.clone())
    }

    fn delete_latest(&mut self) -> Result<Option<Record>, Error> {
        let removed = self.records.pop();

        if let Some(record) = &removed {
            self.notify(StoreEvent::DeletedLatest(record.clone()));
        }

        Ok(removed)
    }

    fn clear(&mut self) -> Result<usize, Error> {
        let removed = self.records.len();
        self.records.clear();

        self.notify(StoreEvent::Cleared);

        Ok(removed)
    }

    fn destroy(self) -> Result<(), Error> {
        self.notify(StoreEvent::Destroyed);

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
