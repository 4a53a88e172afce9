pub const TRIPS_TABLE_NAME: &str = "Trips";
pub const TRIP_ID: &str = "trip_id";
pub const NAME: &str = "name";
pub const START_DATE: &str = "start_date";
pub const END_DATE: &str = "end_date";
pub const DESTINATION: &str = "destination";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const COLLECTIONS: &str = "collections";

pub const ITEMS_TABLE_NAME: &str = "Items";
pub const ITEM_ID: &str = "item_id";
pub const KIND: &str = "kind";
// Trip id
pub const BODY: &str = "body";

pub const ITEMS_BY_TRIP_INDEX: &str = "ItemsByTrip";
