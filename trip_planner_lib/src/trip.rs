use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "sqlx")]
use sqlx::{prelude::*, sqlite::SqliteRow};

use crate::{
    ids::{ItemId, TripId},
    items::{Accommodation, Activity, AnyItem, DiningLocation, Event, ItemKind, PointOfInterest, Transportation},
    location::{Coordinate, LocationResult},
};

/// The persisted trip record. Items are referenced by id, one ordered list per kind.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Trip {
    pub trip_id: TripId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub destination: String,
    pub latitude: f64,
    pub longitude: f64,
    pub collections: TripCollections,
}

/// Expects the columns `trip_id, name, start_date, end_date, destination, latitude,
/// longitude, collections`.
#[cfg(feature = "sqlx")]
impl FromRow<'_, SqliteRow> for Trip {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let trip_id: String = row.try_get(0)?;
        let collections: Vec<u8> = row.try_get(7)?;
        let collections = if collections.is_empty() {
            TripCollections::default()
        } else {
            bincode::deserialize::<TripCollections>(&collections).map_err(|e| sqlx::Error::Decode(Box::new(e)))?
        };

        Ok(Self {
            trip_id: trip_id.parse::<TripId>().map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            name: row.try_get(1)?,
            start_date: row.try_get(2)?,
            end_date: row.try_get(3)?,
            destination: row.try_get(4)?,
            latitude: row.try_get(5)?,
            longitude: row.try_get(6)?,
            collections,
        })
    }
}

impl Trip {
    /// Builds a fresh trip with a new id and six empty collections.
    pub fn new(new_trip: NewTrip) -> Self {
        Self {
            trip_id: TripId::new(),
            name: new_trip.name,
            start_date: new_trip.start_date,
            end_date: new_trip.end_date,
            destination: new_trip.destination,
            latitude: new_trip.latitude,
            longitude: new_trip.longitude,
            collections: TripCollections::default(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Ordered item references, one list per item kind.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct TripCollections {
    pub accommodations: Vec<ItemId>,
    pub activities: Vec<ItemId>,
    pub dining_locations: Vec<ItemId>,
    pub events: Vec<ItemId>,
    pub points_of_interest: Vec<ItemId>,
    pub transportations: Vec<ItemId>,
}

impl TripCollections {
    pub fn get(&self, kind: ItemKind) -> &Vec<ItemId> {
        match kind {
            ItemKind::Accommodation => &self.accommodations,
            ItemKind::Activity => &self.activities,
            ItemKind::DiningLocation => &self.dining_locations,
            ItemKind::Event => &self.events,
            ItemKind::PointOfInterest => &self.points_of_interest,
            ItemKind::Transportation => &self.transportations,
        }
    }

    pub fn get_mut(&mut self, kind: ItemKind) -> &mut Vec<ItemId> {
        match kind {
            ItemKind::Accommodation => &mut self.accommodations,
            ItemKind::Activity => &mut self.activities,
            ItemKind::DiningLocation => &mut self.dining_locations,
            ItemKind::Event => &mut self.events,
            ItemKind::PointOfInterest => &mut self.points_of_interest,
            ItemKind::Transportation => &mut self.transportations,
        }
    }

    pub fn contains(&self, kind: ItemKind, item_id: ItemId) -> bool {
        self.get(kind).contains(&item_id)
    }

    /// Removes `item_id` from the `kind` list. Returns whether it was there.
    pub fn remove(&mut self, kind: ItemKind, item_id: ItemId) -> bool {
        let list = self.get_mut(kind);
        let before = list.len();
        list.retain(|id| *id != item_id);
        list.len() != before
    }

    pub fn len(&self) -> usize {
        ItemKind::ALL.iter().map(|kind| self.get(*kind).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemKind, ItemId)> + '_ {
        ItemKind::ALL
            .iter()
            .flat_map(move |kind| self.get(*kind).iter().map(move |id| (*kind, *id)))
    }
}

/// Input for creating a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrip {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub destination: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewTrip {
    /// Fills destination and coordinate from a location pick.
    pub fn with_destination(mut self, result: LocationResult) -> Self {
        self.latitude = result.latitude;
        self.longitude = result.longitude;
        self.destination = result.display_text;
        self
    }

    /// The end date must not come before the start date. The store leaves this check
    /// to whoever builds the trip.
    pub fn has_valid_dates(&self) -> bool {
        self.end_date >= self.start_date
    }
}

/// Scalar changes to a trip. `None` leaves a field as it is. Collections are never
/// touched by a patch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TripPatch {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub destination: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl TripPatch {
    pub fn is_empty(&self) -> bool {
        *self == TripPatch::default()
    }

    pub fn apply(self, trip: &mut Trip) {
        if let Some(name) = self.name {
            trip.name = name;
        }
        if let Some(start_date) = self.start_date {
            trip.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            trip.end_date = end_date;
        }
        if let Some(destination) = self.destination {
            trip.destination = destination;
        }
        if let Some(latitude) = self.latitude {
            trip.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            trip.longitude = longitude;
        }
    }
}

/// A trip with every collection resolved to the items themselves, in list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSnapshot {
    pub trip: Trip,
    pub items: TripItems,
}

impl TripSnapshot {
    /// Sum of every priced item in the trip.
    pub fn total_cost(&self) -> f64 {
        self.items.iter().filter_map(|item| item.cost()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TripItems {
    pub accommodations: Vec<Accommodation>,
    pub activities: Vec<Activity>,
    pub dining_locations: Vec<DiningLocation>,
    pub events: Vec<Event>,
    pub points_of_interest: Vec<PointOfInterest>,
    pub transportations: Vec<Transportation>,
}

impl TripItems {
    /// Sorts an item into the list of its kind, keeping arrival order.
    pub fn push(&mut self, item: AnyItem) {
        match item {
            AnyItem::Accommodation(item) => self.accommodations.push(item),
            AnyItem::Activity(item) => self.activities.push(item),
            AnyItem::DiningLocation(item) => self.dining_locations.push(item),
            AnyItem::Event(item) => self.events.push(item),
            AnyItem::PointOfInterest(item) => self.points_of_interest.push(item),
            AnyItem::Transportation(item) => self.transportations.push(item),
        }
    }

    pub fn len(&self) -> usize {
        self.accommodations.len()
            + self.activities.len()
            + self.dining_locations.len()
            + self.events.len()
            + self.points_of_interest.len()
            + self.transportations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every item as an [`AnyItem`], grouped by kind.
    pub fn iter(&self) -> impl Iterator<Item = AnyItem> + '_ {
        let accommodations = self.accommodations.iter().cloned().map(AnyItem::Accommodation);
        let activities = self.activities.iter().cloned().map(AnyItem::Activity);
        let dining = self.dining_locations.iter().cloned().map(AnyItem::DiningLocation);
        let events = self.events.iter().cloned().map(AnyItem::Event);
        let points = self.points_of_interest.iter().cloned().map(AnyItem::PointOfInterest);
        let transport = self.transportations.iter().cloned().map(AnyItem::Transportation);

        accommodations
            .chain(activities)
            .chain(dining)
            .chain(events)
            .chain(points)
            .chain(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{items::{Item, PoiCategory, PointOfInterest}, location::Location};

    fn paris() -> NewTrip {
        NewTrip {
            name: "Paris".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 7).unwrap(),
            destination: "Paris, France".into(),
            latitude: 48.8566,
            longitude: 2.3522,
        }
    }

    #[test]
    fn new_trips_start_empty() {
        let trip = Trip::new(paris());
        assert!(trip.collections.is_empty());
        assert_eq!(trip.duration_days(), 7);
    }

    #[test]
    fn collections_keep_order_per_kind() {
        let mut collections = TripCollections::default();
        let (a, b, c) = (ItemId::new(), ItemId::new(), ItemId::new());
        collections.get_mut(ItemKind::Event).extend([a, b, c]);
        collections.get_mut(ItemKind::Activity).push(ItemId::new());

        assert!(collections.remove(ItemKind::Event, b));
        assert!(!collections.remove(ItemKind::Event, b));
        assert_eq!(collections.get(ItemKind::Event), &vec![a, c]);
        assert_eq!(collections.len(), 3);
        assert_eq!(collections.iter().filter(|(kind, _)| *kind == ItemKind::Event).count(), 2);
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut trip = Trip::new(paris());
        let collections = trip.collections.clone();
        TripPatch {
            name: Some("Paris again".into()),
            latitude: Some(48.0),
            ..Default::default()
        }
        .apply(&mut trip);

        assert_eq!(trip.name, "Paris again");
        assert_eq!(trip.latitude, 48.0);
        assert_eq!(trip.destination, "Paris, France");
        assert_eq!(trip.collections, collections);
    }

    #[test]
    fn destination_from_location_pick() {
        let new_trip = paris().with_destination(LocationResult {
            display_text: "Lyon, Auvergne-Rhône-Alpes".into(),
            latitude: 45.764,
            longitude: 4.8357,
        });
        assert_eq!(new_trip.destination, "Lyon, Auvergne-Rhône-Alpes");
        assert_eq!(new_trip.latitude, 45.764);
    }

    #[test]
    fn date_order_check() {
        let mut new_trip = paris();
        assert!(new_trip.has_valid_dates());
        new_trip.end_date = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
        assert!(!new_trip.has_valid_dates());
    }

    #[test]
    fn snapshot_total_cost_skips_unpriced_items() {
        let mut items = TripItems::default();
        let mut poi = PointOfInterest::new("Musée d'Orsay", Location::new("Rue de la Légion d'Honneur", 48.86, 2.3266), PoiCategory::Cultural, 120);
        poi.entry_fee = Some(16.0);
        items.push(poi.into_any());
        items.push(PointOfInterest::new("Jardin du Luxembourg", Location::default(), PoiCategory::Natural, 60).into_any());

        let snapshot = TripSnapshot { trip: Trip::new(paris()), items };
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.total_cost(), 16.0);
    }
}
