use std::{marker::PhantomData, sync::Arc};

use tracing::{debug, info, instrument};
use trip_planner_lib::{Item, ItemId, TripId};

use crate::{
    database::{RecordStore, WriteBatch},
    RecordStoreError, StoreError,
};

use super::locks::TripLocks;

/// CRUD for one item kind, always scoped to a trip.
///
/// Adding and removing change the item record and the trip's collection in the
/// same batch, so the collection and the item's back-reference always agree.
pub struct ItemRepository<T> {
    records: Arc<dyn RecordStore>,
    locks: TripLocks,
    kind: PhantomData<fn() -> T>,
}

impl<T> Clone for ItemRepository<T> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            locks: self.locks.clone(),
            kind: PhantomData,
        }
    }
}

impl<T: Item> ItemRepository<T> {
    pub(crate) fn new(records: Arc<dyn RecordStore>, locks: TripLocks) -> Self {
        Self {
            records,
            locks,
            kind: PhantomData,
        }
    }

    /// Attaches `item` to the trip and appends it to the trip's collection for this
    /// kind. Returns the stored item.
    ///
    /// Fails with `NotFound` if the trip does not exist and with `AlreadyAttached`
    /// if the item is already stored or already claims a trip.
    #[instrument(skip_all, fields(kind = %T::KIND, item = %item.item_id(), trip = %trip_id))]
    pub async fn add(&self, mut item: T, trip_id: TripId) -> Result<T, StoreError> {
        let item_id = item.item_id();
        let _guard = self.locks.acquire(trip_id).await;

        let mut trip = self.records.get_trip(trip_id).await?
            .ok_or_else(|| StoreError::trip_not_found(trip_id))?;

        if let Some(existing) = self.records.get_item(item_id).await? {
            return Err(StoreError::AlreadyAttached { item: item_id, trip: existing.trip() });
        }
        if let Some(owner) = item.trip() {
            return Err(StoreError::AlreadyAttached { item: item_id, trip: Some(owner) });
        }

        item.set_trip(Some(trip_id));
        trip.collections.get_mut(T::KIND).push(item_id);

        let batch = WriteBatch::new()
            .insert_item(item.clone().into_any())
            .put_trip(trip);
        self.records.commit(batch).await.map_err(|e| match e {
            // Another trip attached the same item first.
            RecordStoreError::Conflict(_) => StoreError::AlreadyAttached { item: item_id, trip: None },
            RecordStoreError::Missing(_) => StoreError::trip_not_found(trip_id),
            e => StoreError::Storage(e),
        })?;

        info!("Added {} to trip", T::KIND);
        Ok(item)
    }

    /// Detaches the item from the trip and deletes it. Returns the deleted item.
    ///
    /// Fails with `NotFound` unless the item is currently attached to that trip.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn remove(&self, item_id: ItemId, trip_id: TripId) -> Result<T, StoreError> {
        let _guard = self.locks.acquire(trip_id).await;

        let mut trip = self.records.get_trip(trip_id).await?
            .ok_or_else(|| StoreError::trip_not_found(trip_id))?;

        let mut item = self.load(item_id).await?
            .filter(|item| item.trip() == Some(trip_id))
            .ok_or_else(|| StoreError::item_not_found(item_id))?;
        if !trip.collections.remove(T::KIND, item_id) {
            return Err(StoreError::item_not_found(item_id));
        }

        let batch = WriteBatch::new()
            .delete_item(item_id)
            .put_trip(trip);
        self.records.commit(batch).await.map_err(|e| match e {
            RecordStoreError::Missing(_) => StoreError::item_not_found(item_id),
            e => StoreError::Storage(e),
        })?;

        item.set_trip(None);
        info!("Removed {} from trip", T::KIND);
        Ok(item)
    }

    /// Applies `patch` to an attached item. The item keeps its id and its trip
    /// whatever the patch does to them.
    #[instrument(skip(self, patch), fields(kind = %T::KIND))]
    pub async fn update<F>(&self, item_id: ItemId, patch: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut T) + Send,
    {
        let trip_id = self.load(item_id).await?
            .and_then(|item| item.trip())
            .ok_or_else(|| StoreError::item_not_found(item_id))?;

        let _guard = self.locks.acquire(trip_id).await;

        // Re-read under the lock; the item may have been removed meanwhile.
        let mut item = self.load(item_id).await?
            .filter(|item| item.trip() == Some(trip_id))
            .ok_or_else(|| StoreError::item_not_found(item_id))?;

        patch(&mut item);
        if item.item_id() != item_id {
            return Err(StoreError::Validation("an item's id cannot be changed".into()));
        }
        item.set_trip(Some(trip_id));

        self.records.commit(WriteBatch::new().put_item(item.clone().into_any())).await.map_err(|e| match e {
            RecordStoreError::Missing(_) => StoreError::item_not_found(item_id),
            e => StoreError::Storage(e),
        })?;

        info!("Updated {}", T::KIND);
        Ok(item)
    }

    /// The trip's items of this kind in insertion order.
    pub async fn list_for(&self, trip_id: TripId) -> Result<Vec<T>, StoreError> {
        let _guard = self.locks.acquire(trip_id).await;

        let trip = self.records.get_trip(trip_id).await?
            .ok_or_else(|| StoreError::trip_not_found(trip_id))?;

        let items = self.records.get_items(trip.collections.get(T::KIND)).await?;
        Ok(items.into_iter().filter_map(T::from_any).collect())
    }

    /// Looks up a stored item of this kind.
    pub async fn get(&self, item_id: ItemId) -> Result<Option<T>, StoreError> {
        self.load(item_id).await
    }

    async fn load(&self, item_id: ItemId) -> Result<Option<T>, StoreError> {
        let item = self.records.get_item(item_id).await?.and_then(T::from_any);
        if item.is_none() {
            debug!("No {} with id {item_id}", T::KIND);
        }
        Ok(item)
    }
}
