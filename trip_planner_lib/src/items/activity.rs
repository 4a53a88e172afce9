use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::impl_item;
use crate::{ids::{ItemId, TripId}, location::Location};

/// Tours, excursions and other booked or planned experiences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub item_id: ItemId,
    #[serde(default)]
    pub trip: Option<TripId>,
    pub name: String,
    pub location: Location,
    pub date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub cost: f64,
    #[serde(default)]
    pub booking_required: bool,
    pub booking_confirmation_number: Option<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl Activity {
    pub fn new(name: impl Into<String>, location: Location, date: DateTime<Utc>, duration_minutes: u32, cost: f64) -> Self {
        Self {
            item_id: ItemId::new(),
            trip: None,
            name: name.into(),
            location,
            date,
            duration_minutes,
            cost,
            booking_required: false,
            booking_confirmation_number: None,
            equipment: Vec::new(),
            notes: String::new(),
        }
    }
}

impl_item!(Activity, location, |s| s.name.clone(), |s| Some(s.cost));
