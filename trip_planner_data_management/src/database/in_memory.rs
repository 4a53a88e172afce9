use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use trip_planner_lib::{AnyItem, ItemId, Trip, TripId};

use crate::RecordStoreError;

use super::{RecordStore, WriteBatch, WriteOp};

#[derive(Debug, Clone, Default)]
struct Tables {
    trips: HashMap<TripId, Trip>,
    items: HashMap<ItemId, AnyItem>,
}

impl Tables {
    fn apply(&mut self, op: WriteOp) -> Result<(), RecordStoreError> {
        match op {
            WriteOp::InsertTrip(trip) => {
                if self.trips.contains_key(&trip.trip_id) {
                    return Err(RecordStoreError::Conflict(format!("trip {}", trip.trip_id)));
                }
                self.trips.insert(trip.trip_id, trip);
            }
            WriteOp::PutTrip(trip) => {
                let slot = self.trips.get_mut(&trip.trip_id)
                    .ok_or_else(|| RecordStoreError::Missing(format!("trip {}", trip.trip_id)))?;
                *slot = trip;
            }
            WriteOp::DeleteTrip(trip_id) => {
                if self.trips.remove(&trip_id).is_none() {
                    return Err(RecordStoreError::Missing(format!("trip {trip_id}")));
                }
                self.items.retain(|_, item| item.trip() != Some(trip_id));
            }
            WriteOp::InsertItem(item) => {
                let item_id = item.item_id();
                if self.items.contains_key(&item_id) {
                    return Err(RecordStoreError::Conflict(format!("item {item_id}")));
                }
                self.check_trip_reference(&item)?;
                self.items.insert(item_id, item);
            }
            WriteOp::PutItem(item) => {
                let item_id = item.item_id();
                if !self.items.contains_key(&item_id) {
                    return Err(RecordStoreError::Missing(format!("item {item_id}")));
                }
                self.check_trip_reference(&item)?;
                self.items.insert(item_id, item);
            }
            WriteOp::DeleteItem(item_id) => {
                if self.items.remove(&item_id).is_none() {
                    return Err(RecordStoreError::Missing(format!("item {item_id}")));
                }
            }
        }

        Ok(())
    }

    fn check_trip_reference(&self, item: &AnyItem) -> Result<(), RecordStoreError> {
        match item.trip() {
            Some(trip_id) if !self.trips.contains_key(&trip_id) => {
                Err(RecordStoreError::Missing(format!("trip referenced by item {}", item.item_id())))
            }
            _ => Ok(()),
        }
    }
}

/// [`RecordStore`] kept in process memory. Used by tests and by callers that do not
/// need the trips to outlive the process.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: Mutex<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_trip(&self, trip_id: TripId) -> Result<Option<Trip>, RecordStoreError> {
        Ok(self.tables.lock().await.trips.get(&trip_id).cloned())
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, RecordStoreError> {
        let mut trips: Vec<Trip> = self.tables.lock().await.trips.values().cloned().collect();
        trips.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.name.cmp(&b.name)));
        Ok(trips)
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Option<AnyItem>, RecordStoreError> {
        Ok(self.tables.lock().await.items.get(&item_id).cloned())
    }

    async fn get_items(&self, item_ids: &[ItemId]) -> Result<Vec<AnyItem>, RecordStoreError> {
        let tables = self.tables.lock().await;
        Ok(item_ids.iter().filter_map(|id| tables.items.get(id).cloned()).collect())
    }

    async fn items_referencing(&self, trip_id: TripId) -> Result<Vec<ItemId>, RecordStoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .items
            .values()
            .filter(|item| item.trip() == Some(trip_id))
            .map(|item| item.item_id())
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RecordStoreError> {
        let mut tables = self.tables.lock().await;

        // Work on a copy so a failing op leaves the committed tables untouched.
        let mut staged = tables.clone();
        for op in batch {
            staged.apply(op)?;
        }
        *tables = staged;

        Ok(())
    }
}
