use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::impl_item;
use crate::{ids::{ItemId, TripId}, location::Location};

labelled_enum! {
    pub enum TransportationMode {
        Flight => ("flight", "Flight"),
        Train => ("train", "Train"),
        Bus => ("bus", "Bus"),
        Car => ("car", "Car"),
        Other => ("other", "Other"),
    }
}

/// One travel leg. Only the departure point is geocoded; the arrival is free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transportation {
    #[serde(default)]
    pub item_id: ItemId,
    #[serde(default)]
    pub trip: Option<TripId>,
    pub mode: TransportationMode,
    pub departure: Location,
    pub arrival_location: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub company: Option<String>,
    pub reservation_number: Option<String>,
    pub cost: f64,
    #[serde(default)]
    pub notes: String,
}

impl Transportation {
    pub fn new(
        mode: TransportationMode,
        departure: Location,
        arrival_location: impl Into<String>,
        departure_time: DateTime<Utc>,
        arrival_time: DateTime<Utc>,
        cost: f64,
    ) -> Self {
        Self {
            item_id: ItemId::new(),
            trip: None,
            mode,
            departure,
            arrival_location: arrival_location.into(),
            departure_time,
            arrival_time,
            company: None,
            reservation_number: None,
            cost,
            notes: String::new(),
        }
    }
}

impl_item!(
    Transportation,
    departure,
    |s| format!("{} to {}", s.mode, s.arrival_location),
    |s| Some(s.cost)
);
