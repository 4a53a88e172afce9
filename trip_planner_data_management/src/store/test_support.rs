use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Notify;
use trip_planner_lib::{AnyItem, ItemId, NewTrip, Trip, TripId};

use crate::{
    database::{InMemoryRecordStore, RecordStore, WriteBatch},
    RecordStoreError,
};

pub fn paris() -> NewTrip {
    NewTrip {
        name: "Paris".into(),
        start_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 5, 7).unwrap(),
        destination: "Paris, Île-de-France, France".into(),
        latitude: 48.8566,
        longitude: 2.3522,
    }
}

/// In-memory records whose next commit can be made to fail.
#[derive(Default)]
pub struct FlakyRecordStore {
    inner: InMemoryRecordStore,
    fail_next: AtomicBool,
}

impl FlakyRecordStore {
    pub fn fail_next_commit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FlakyRecordStore {
    async fn get_trip(&self, trip_id: TripId) -> Result<Option<Trip>, RecordStoreError> {
        self.inner.get_trip(trip_id).await
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, RecordStoreError> {
        self.inner.list_trips().await
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Option<AnyItem>, RecordStoreError> {
        self.inner.get_item(item_id).await
    }

    async fn get_items(&self, item_ids: &[ItemId]) -> Result<Vec<AnyItem>, RecordStoreError> {
        self.inner.get_items(item_ids).await
    }

    async fn items_referencing(&self, trip_id: TripId) -> Result<Vec<ItemId>, RecordStoreError> {
        self.inner.items_referencing(trip_id).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RecordStoreError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(RecordStoreError::Backend("disk full".into()));
        }
        self.inner.commit(batch).await
    }
}

/// In-memory records whose next `get_items` call stops until [`resume`] is called.
///
/// [`resume`]: PausingRecordStore::resume
#[derive(Default)]
pub struct PausingRecordStore {
    inner: InMemoryRecordStore,
    pause_next: AtomicBool,
    parked: Notify,
    resumed: Notify,
}

impl PausingRecordStore {
    pub fn pause_next_get_items(&self) {
        self.pause_next.store(true, Ordering::SeqCst);
    }

    /// Returns once a paused `get_items` call is waiting.
    pub async fn wait_until_parked(&self) {
        self.parked.notified().await;
    }

    pub fn resume(&self) {
        self.resumed.notify_one();
    }
}

#[async_trait]
impl RecordStore for PausingRecordStore {
    async fn get_trip(&self, trip_id: TripId) -> Result<Option<Trip>, RecordStoreError> {
        self.inner.get_trip(trip_id).await
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, RecordStoreError> {
        self.inner.list_trips().await
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Option<AnyItem>, RecordStoreError> {
        self.inner.get_item(item_id).await
    }

    async fn get_items(&self, item_ids: &[ItemId]) -> Result<Vec<AnyItem>, RecordStoreError> {
        if self.pause_next.swap(false, Ordering::SeqCst) {
            self.parked.notify_one();
            self.resumed.notified().await;
        }
        self.inner.get_items(item_ids).await
    }

    async fn items_referencing(&self, trip_id: TripId) -> Result<Vec<ItemId>, RecordStoreError> {
        self.inner.items_referencing(trip_id).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RecordStoreError> {
        self.inner.commit(batch).await
    }
}
