//! Persistence and location resolution for the trip planner.
//!
//! [`TripStore`] owns every trip and, through one [`ItemRepository`] per item kind,
//! every item planned inside a trip. [`LocationResolutionSession`] drives the
//! search-and-pick flow that produces the coordinates stored on trips and items.

use std::path::PathBuf;

use const_format::concatcp;

pub mod database;
mod error;
pub mod location;
mod store;

pub use error::{EntityRef, RecordStoreError, StoreError};
pub use location::{
    camera::CameraState,
    debouncer::{DebouncerState, SearchDebouncer},
    geocoding::{GeocodingClient, ProviderError, ResolutionFailed},
    nominatim::{NominatimConfig, NominatimGeocodingClient},
    session::{LocationResolutionSession, SessionConfig, SessionEvent, TapOutcome},
};
pub use store::{item_repository::ItemRepository, trip_store::TripStore};

pub const DATA_DIR: &str = "data/";
pub const DATABASE_PATH: &str = concatcp!(DATA_DIR, "trips.db");

/// Resolves [`DATABASE_PATH`] against the project root, creating the data directory
/// if needed.
pub fn default_database_path() -> Result<PathBuf, StoreError> {
    let root = project_root::get_project_root()
        .map_err(|e| StoreError::Storage(RecordStoreError::Backend(format!("Failed to locate project root: {e}"))))?;

    let data_dir = root.join(DATA_DIR);
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            StoreError::Storage(RecordStoreError::Backend(format!("Failed to create data directory {data_dir:?}: {e}")))
        })?;
    }

    Ok(root.join(DATABASE_PATH))
}
