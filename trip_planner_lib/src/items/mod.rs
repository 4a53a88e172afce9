//! The six kinds of things that can be planned inside a trip.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ids::{ItemId, TripId}, location::Location};

/// Declares a closed set of named variants with a display label and a lowercase
/// wire name.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($wire:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::items::ParseLabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str() == wanted || candidate.label().to_lowercase() == wanted)
                    .ok_or_else(|| $crate::items::ParseLabelError {
                        kind: stringify!($name),
                        value: s.to_owned(),
                    })
            }
        }
    };
}

mod accommodation;
mod activity;
mod dining_location;
mod event;
mod point_of_interest;
mod transportation;

pub use accommodation::Accommodation;
pub use activity::Activity;
pub use dining_location::{DiningLocation, PriceRange};
pub use event::{Event, EventCategory};
pub use point_of_interest::{PoiCategory, PointOfInterest};
pub use transportation::{Transportation, TransportationMode};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

labelled_enum! {
    /// Discriminates the six item collections of a trip.
    pub enum ItemKind {
        Accommodation => ("accommodation", "Accommodation"),
        Activity => ("activity", "Activity"),
        DiningLocation => ("dining_location", "Dining"),
        Event => ("event", "Event"),
        PointOfInterest => ("point_of_interest", "Point of Interest"),
        Transportation => ("transportation", "Transportation"),
    }
}

/// Behaviour shared by every item kind. Implemented by the six item structs so the
/// store can be written once, generic over the kind.
pub trait Item: Clone + Send + Sync + 'static {
    const KIND: ItemKind;

    fn item_id(&self) -> ItemId;

    /// The trip this item belongs to. `None` while the item is unattached.
    fn trip(&self) -> Option<TripId>;

    fn set_trip(&mut self, trip: Option<TripId>);

    /// Title used in item lists.
    fn label(&self) -> String;

    fn location(&self) -> &Location;

    /// What the item costs, if it has a price at all.
    fn cost(&self) -> Option<f64>;

    fn into_any(self) -> AnyItem;

    fn from_any(item: AnyItem) -> Option<Self>;
}

macro_rules! impl_item {
    ($ty:ident, $location:ident, |$label_self:ident| $label:expr, |$cost_self:ident| $cost:expr) => {
        impl $crate::items::Item for $ty {
            const KIND: $crate::items::ItemKind = $crate::items::ItemKind::$ty;

            fn item_id(&self) -> $crate::ids::ItemId {
                self.item_id
            }

            fn trip(&self) -> Option<$crate::ids::TripId> {
                self.trip
            }

            fn set_trip(&mut self, trip: Option<$crate::ids::TripId>) {
                self.trip = trip;
            }

            fn label(&self) -> String {
                let $label_self = self;
                $label
            }

            fn location(&self) -> &$crate::location::Location {
                &self.$location
            }

            fn cost(&self) -> Option<f64> {
                let $cost_self = self;
                $cost
            }

            fn into_any(self) -> $crate::items::AnyItem {
                $crate::items::AnyItem::$ty(self)
            }

            fn from_any(item: $crate::items::AnyItem) -> Option<Self> {
                match item {
                    $crate::items::AnyItem::$ty(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

pub(crate) use impl_item;

/// Any item, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnyItem {
    Accommodation(Accommodation),
    Activity(Activity),
    DiningLocation(DiningLocation),
    Event(Event),
    PointOfInterest(PointOfInterest),
    Transportation(Transportation),
}

macro_rules! dispatch {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            AnyItem::Accommodation($inner) => $body,
            AnyItem::Activity($inner) => $body,
            AnyItem::DiningLocation($inner) => $body,
            AnyItem::Event($inner) => $body,
            AnyItem::PointOfInterest($inner) => $body,
            AnyItem::Transportation($inner) => $body,
        }
    };
}

impl AnyItem {
    pub fn kind(&self) -> ItemKind {
        dispatch!(self, item => kind_of(item))
    }

    pub fn item_id(&self) -> ItemId {
        dispatch!(self, item => item.item_id())
    }

    pub fn trip(&self) -> Option<TripId> {
        dispatch!(self, item => item.trip())
    }

    pub fn set_trip(&mut self, trip: Option<TripId>) {
        dispatch!(self, item => item.set_trip(trip))
    }

    pub fn label(&self) -> String {
        dispatch!(self, item => item.label())
    }

    pub fn location(&self) -> &Location {
        dispatch!(self, item => item.location())
    }

    pub fn cost(&self) -> Option<f64> {
        dispatch!(self, item => item.cost())
    }

    pub fn notes(&self) -> &str {
        dispatch!(self, item => item.notes.as_str())
    }
}

fn kind_of<T: Item>(_: &T) -> ItemKind {
    T::KIND
}

#[cfg(feature = "sqlx")]
mod row {
    use sqlx::{prelude::*, sqlite::SqliteRow};

    use super::AnyItem;
    use crate::ids::TripId;

    /// Expects the columns `item_id, kind, trip_id, body`. The `trip_id` column is
    /// authoritative for the back-reference.
    impl FromRow<'_, SqliteRow> for AnyItem {
        fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
            let body: Vec<u8> = row.try_get(3)?;
            let mut item: AnyItem = bincode::deserialize(&body).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

            let trip_id: Option<String> = row.try_get(2)?;
            let trip_id = trip_id
                .map(|raw| raw.parse::<TripId>())
                .transpose()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            item.set_trip(trip_id);

            Ok(item)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn museum() -> PointOfInterest {
        PointOfInterest::new("Louvre", Location::new("Rue de Rivoli, Paris", 48.8606, 2.3376), PoiCategory::Cultural, 180)
    }

    #[test]
    fn kinds_parse_from_wire_names_and_labels() {
        assert_eq!("dining_location".parse::<ItemKind>().unwrap(), ItemKind::DiningLocation);
        assert_eq!("Point of Interest".parse::<ItemKind>().unwrap(), ItemKind::PointOfInterest);
        assert!("hotel".parse::<ItemKind>().is_err());
    }

    #[test]
    fn any_item_reports_kind_and_id() {
        let poi = museum();
        let id = poi.item_id;
        let any = poi.into_any();
        assert_eq!(any.kind(), ItemKind::PointOfInterest);
        assert_eq!(any.item_id(), id);
        assert_eq!(any.label(), "Louvre");
        assert_eq!(any.cost(), None);
    }

    #[test]
    fn from_any_rejects_other_kinds() {
        let any = museum().into_any();
        assert!(Accommodation::from_any(any.clone()).is_none());
        assert!(PointOfInterest::from_any(any).is_some());
    }

    #[test]
    fn set_trip_reaches_the_inner_item() {
        let trip = TripId::new();
        let mut any = Accommodation::new(
            "Hotel du Louvre",
            Location::new("Place André Malraux", 48.8630, 2.3356),
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 4).unwrap(),
            540.0,
        )
        .into_any();
        any.set_trip(Some(trip));
        assert_eq!(any.trip(), Some(trip));
        assert_eq!(any.cost(), Some(540.0));
    }

    #[test]
    fn json_items_get_fresh_ids_and_no_trip() {
        let json = r#"{"point_of_interest": {
            "name": "Tivoli",
            "location": {"address": "Vesterbrogade 3", "latitude": 55.6736, "longitude": 12.5681},
            "category": "recreational",
            "opening_hours": null,
            "entry_fee": 155.0,
            "recommended_visit_minutes": 240,
            "notes": ""
        }}"#;
        let item: AnyItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind(), ItemKind::PointOfInterest);
        assert_eq!(item.trip(), None);
        assert_eq!(item.cost(), Some(155.0));
    }

    #[test]
    fn items_survive_bincode() {
        let any = museum().into_any();
        let bytes = bincode::serialize(&any).unwrap();
        let back: AnyItem = bincode::deserialize(&bytes).unwrap();
        assert_eq!(any, back);
    }
}
