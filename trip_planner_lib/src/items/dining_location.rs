use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::impl_item;
use crate::{ids::{ItemId, TripId}, location::Location};

labelled_enum! {
    pub enum PriceRange {
        Budget => ("budget", "Budget"),
        Moderate => ("moderate", "Moderate"),
        Expensive => ("expensive", "Expensive"),
        Luxury => ("luxury", "Luxury"),
    }
}

/// A restaurant, cafe or other planned meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningLocation {
    #[serde(default)]
    pub item_id: ItemId,
    #[serde(default)]
    pub trip: Option<TripId>,
    pub name: String,
    pub location: Location,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub cuisine: String,
    pub price_range: PriceRange,
    #[serde(default)]
    pub reservation_required: bool,
    pub reservation_confirmation_number: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl DiningLocation {
    pub fn new(
        name: impl Into<String>,
        location: Location,
        date: NaiveDate,
        time: NaiveTime,
        cuisine: impl Into<String>,
        price_range: PriceRange,
    ) -> Self {
        Self {
            item_id: ItemId::new(),
            trip: None,
            name: name.into(),
            location,
            date,
            time,
            cuisine: cuisine.into(),
            price_range,
            reservation_required: false,
            reservation_confirmation_number: None,
            notes: String::new(),
        }
    }
}

// Dining has no fixed price, only a range.
impl_item!(DiningLocation, location, |s| s.name.clone(), |_s| None);
