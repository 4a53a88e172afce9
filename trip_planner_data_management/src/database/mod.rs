//! The persistence port behind the trip store, plus its SQLite and in-memory
//! backends.

use async_trait::async_trait;
use trip_planner_lib::{AnyItem, ItemId, Trip, TripId};

use crate::RecordStoreError;

pub mod constants;
pub mod db;
pub mod in_memory;

pub use db::SqliteRecordStore;
pub use in_memory::InMemoryRecordStore;

/// A key-indexed store for trip and item records.
///
/// Reads see committed state only. [`RecordStore::commit`] applies a whole
/// [`WriteBatch`] or nothing.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_trip(&self, trip_id: TripId) -> Result<Option<Trip>, RecordStoreError>;

    async fn list_trips(&self) -> Result<Vec<Trip>, RecordStoreError>;

    async fn get_item(&self, item_id: ItemId) -> Result<Option<AnyItem>, RecordStoreError>;

    /// Fetches items in the order of `item_ids`. Ids without a record are skipped.
    async fn get_items(&self, item_ids: &[ItemId]) -> Result<Vec<AnyItem>, RecordStoreError>;

    /// Ids of every item whose back-reference points at `trip_id`.
    async fn items_referencing(&self, trip_id: TripId) -> Result<Vec<ItemId>, RecordStoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), RecordStoreError>;
}

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Fails with `Conflict` if the trip exists.
    InsertTrip(Trip),
    /// Fails with `Missing` if the trip does not exist.
    PutTrip(Trip),
    /// Also removes every item referencing the trip.
    DeleteTrip(TripId),
    InsertItem(AnyItem),
    PutItem(AnyItem),
    DeleteItem(ItemId),
}

/// Writes that are committed together, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn insert_trip(mut self, trip: Trip) -> Self {
        self.ops.push(WriteOp::InsertTrip(trip));
        self
    }

    pub fn put_trip(mut self, trip: Trip) -> Self {
        self.ops.push(WriteOp::PutTrip(trip));
        self
    }

    pub fn delete_trip(mut self, trip_id: TripId) -> Self {
        self.ops.push(WriteOp::DeleteTrip(trip_id));
        self
    }

    pub fn insert_item(mut self, item: AnyItem) -> Self {
        self.ops.push(WriteOp::InsertItem(item));
        self
    }

    pub fn put_item(mut self, item: AnyItem) -> Self {
        self.ops.push(WriteOp::PutItem(item));
        self
    }

    pub fn delete_item(mut self, item_id: ItemId) -> Self {
        self.ops.push(WriteOp::DeleteItem(item_id));
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl IntoIterator for WriteBatch {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}
