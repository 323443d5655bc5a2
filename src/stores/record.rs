//! Defines the record store trait and the change events it emits.

use time::Date;
use tokio::sync::broadcast;

use crate::{
    Error,
    record::{Record, sum_amounts},
};

/// How many unread change events a subscriber may lag behind before it
/// starts missing events.
pub const EVENT_CAPACITY: usize = 64;

/// A change to the record set that has been committed to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A record was appended.
    Appended(Record),
    /// The most recently appended record was removed.
    DeletedLatest(Record),
    /// All records were removed.
    Cleared,
    /// The store and its schema were deleted.
    Destroyed,
}

/// Handles the storage and retrieval of an ordered collection of records.
///
/// Every mutating operation is applied atomically: it either commits in
/// full before returning or leaves the store untouched.
/// Subscribers are notified only after a mutation has been committed.
pub trait RecordStore {
    /// Append a record to the end of the collection.
    ///
    /// # Errors
    /// Returns an [Error::InvalidInput] if `amount` is not a finite number or
    /// if `date` does not satisfy the store's [DateMode](crate::DateMode).
    fn append(&mut self, amount: f64, date: Option<Date>) -> Result<Record, Error>;

    /// Retrieve every record in insertion order.
    fn list_all(&self) -> Result<Vec<Record>, Error>;

    /// The sum of the amounts of all records, zero for an empty store.
    ///
    /// Recomputed from a full scan on every call.
    fn total(&self) -> Result<f64, Error> {
        Ok(sum_amounts(&self.list_all()?))
    }

    /// Remove the most recently appended record and return it.
    ///
    /// Returns `Ok(None)` without emitting an event if the store is empty.
    fn delete_latest(&mut self) -> Result<Option<Record>, Error>;

    /// Remove every record and return how many were removed.
    ///
    /// IDs are not reused after a clear.
    fn clear(&mut self) -> Result<usize, Error>;

    /// Delete the store including its schema.
    ///
    /// The store must be opened again before it can be used.
    fn destroy(self) -> Result<(), Error>
    where
        Self: Sized;

    /// Listen for committed changes to the store.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
