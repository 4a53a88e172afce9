use std::fmt;

use thiserror::Error;
use trip_planner_lib::{ItemId, TripId};

/// The record a lookup was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Trip(TripId),
    Item(ItemId),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Trip(id) => write!(f, "trip {id}"),
            EntityRef::Item(id) => write!(f, "item {id}"),
        }
    }
}

/// Errors from [`TripStore`](crate::TripStore) and the item repositories.
///
/// `NotFound` and `AlreadyAttached` mean the caller broke the store's contract and
/// are not meant to be shown to an end user.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(EntityRef),

    #[error("item {item} is already attached{}", .trip.map(|t| format!(" to trip {t}")).unwrap_or_default())]
    AlreadyAttached { item: ItemId, trip: Option<TripId> },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Storage(#[from] RecordStoreError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn trip_not_found(trip_id: TripId) -> Self {
        StoreError::NotFound(EntityRef::Trip(trip_id))
    }

    pub fn item_not_found(item_id: ItemId) -> Self {
        StoreError::NotFound(EntityRef::Item(item_id))
    }
}

/// Errors raised by a [`RecordStore`](crate::database::RecordStore) backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordStoreError {
    /// An insert hit an existing key.
    #[error("record already exists: {0}")]
    Conflict(String),

    /// An update or delete addressed a key that does not exist.
    #[error("record missing: {0}")]
    Missing(String),

    #[error("{0}")]
    Backend(String),
}
