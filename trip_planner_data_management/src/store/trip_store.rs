use std::{path::Path, sync::Arc};

use tracing::{debug, info, instrument};
use trip_planner_lib::{
    items::{Accommodation, Activity, DiningLocation, Event, PointOfInterest, Transportation},
    ItemKind, NewTrip, Trip, TripId, TripItems, TripPatch, TripSnapshot,
};

use crate::{
    database::{InMemoryRecordStore, RecordStore, SqliteRecordStore, WriteBatch},
    RecordStoreError, StoreError,
};

use super::{item_repository::ItemRepository, locks::TripLocks};

/// The single authority over trips and the items planned inside them.
///
/// Every mutation commits one [`WriteBatch`], so callers see either the state
/// before or after it. Mutations of the same trip are serialized, and trip
/// scoped reads wait for them.
#[derive(Clone)]
pub struct TripStore {
    records: Arc<dyn RecordStore>,
    locks: TripLocks,
    accommodations: ItemRepository<Accommodation>,
    activities: ItemRepository<Activity>,
    dining_locations: ItemRepository<DiningLocation>,
    events: ItemRepository<Event>,
    points_of_interest: ItemRepository<PointOfInterest>,
    transportations: ItemRepository<Transportation>,
}

impl TripStore {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        let locks = TripLocks::new();

        Self {
            accommodations: ItemRepository::new(records.clone(), locks.clone()),
            activities: ItemRepository::new(records.clone(), locks.clone()),
            dining_locations: ItemRepository::new(records.clone(), locks.clone()),
            events: ItemRepository::new(records.clone(), locks.clone()),
            points_of_interest: ItemRepository::new(records.clone(), locks.clone()),
            transportations: ItemRepository::new(records.clone(), locks.clone()),
            records,
            locks,
        }
    }

    /// A store backed by the SQLite database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let records = SqliteRecordStore::connect(path).await?;
        Ok(Self::new(Arc::new(records)))
    }

    /// A store that only lives in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRecordStore::new()))
    }

    pub fn accommodations(&self) -> &ItemRepository<Accommodation> {
        &self.accommodations
    }

    pub fn activities(&self) -> &ItemRepository<Activity> {
        &self.activities
    }

    pub fn dining_locations(&self) -> &ItemRepository<DiningLocation> {
        &self.dining_locations
    }

    pub fn events(&self) -> &ItemRepository<Event> {
        &self.events
    }

    pub fn points_of_interest(&self) -> &ItemRepository<PointOfInterest> {
        &self.points_of_interest
    }

    pub fn transportations(&self) -> &ItemRepository<Transportation> {
        &self.transportations
    }

    /// Persists a new trip with six empty collections. Name and destination must
    /// not be blank; the date order is the caller's responsibility.
    #[instrument(skip_all, fields(name = %new_trip.name))]
    pub async fn create_trip(&self, new_trip: NewTrip) -> Result<TripId, StoreError> {
        require_text("name", &new_trip.name)?;
        require_text("destination", &new_trip.destination)?;

        let trip = Trip::new(new_trip);
        let trip_id = trip.trip_id;
        self.records.commit(WriteBatch::new().insert_trip(trip)).await?;

        info!("Created trip {trip_id}");
        Ok(trip_id)
    }

    /// Removes the trip together with every item that references it.
    #[instrument(skip(self))]
    pub async fn delete_trip(&self, trip_id: TripId) -> Result<(), StoreError> {
        let _guard = self.locks.acquire(trip_id).await;

        if self.records.get_trip(trip_id).await?.is_none() {
            return Err(StoreError::trip_not_found(trip_id));
        }

        let mut batch = WriteBatch::new();
        let item_ids = self.records.items_referencing(trip_id).await?;
        let item_count = item_ids.len();
        for item_id in item_ids {
            batch = batch.delete_item(item_id);
        }
        batch = batch.delete_trip(trip_id);

        self.records.commit(batch).await.map_err(|e| match e {
            RecordStoreError::Missing(_) => StoreError::trip_not_found(trip_id),
            e => StoreError::Storage(e),
        })?;

        info!("Deleted trip {trip_id} and {item_count} items");
        Ok(())
    }

    /// Applies scalar changes. Collections are left alone.
    #[instrument(skip(self, patch))]
    pub async fn update_trip(&self, trip_id: TripId, patch: TripPatch) -> Result<Trip, StoreError> {
        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }
        if let Some(destination) = &patch.destination {
            require_text("destination", destination)?;
        }

        let _guard = self.locks.acquire(trip_id).await;

        let mut trip = self.records.get_trip(trip_id).await?
            .ok_or_else(|| StoreError::trip_not_found(trip_id))?;
        if patch.is_empty() {
            return Ok(trip);
        }

        patch.apply(&mut trip);
        self.records.commit(WriteBatch::new().put_trip(trip.clone())).await?;

        info!("Updated trip {trip_id}");
        Ok(trip)
    }

    /// The trip with every collection resolved, or `None` if there is no such trip.
    /// Waits for mutations of the trip in flight, so the items always match the
    /// collections.
    pub async fn get_trip(&self, trip_id: TripId) -> Result<Option<TripSnapshot>, StoreError> {
        let _guard = self.locks.acquire(trip_id).await;

        let Some(trip) = self.records.get_trip(trip_id).await? else {
            debug!("Trip {trip_id} not found");
            return Ok(None);
        };

        let mut items = TripItems::default();
        for kind in ItemKind::ALL {
            for item in self.records.get_items(trip.collections.get(*kind)).await? {
                items.push(item);
            }
        }

        Ok(Some(TripSnapshot { trip, items }))
    }

    /// Every trip, ordered by start date and then name.
    pub async fn list_trips(&self) -> Result<Vec<Trip>, StoreError> {
        Ok(self.records.list_trips().await?)
    }
}

fn require_text(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
