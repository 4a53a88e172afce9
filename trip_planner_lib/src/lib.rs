pub mod ids;
pub mod items;
pub mod location;
pub mod trip;

pub use ids::{ItemId, TripId};
pub use items::{AnyItem, Item, ItemKind};
pub use location::{AddressComponents, Coordinate, Location, LocationResult, Placemark, SearchLocation};
pub use trip::{NewTrip, Trip, TripCollections, TripItems, TripPatch, TripSnapshot};
