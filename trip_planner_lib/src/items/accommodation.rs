use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::impl_item;
use crate::{ids::{ItemId, TripId}, location::Location};

/// A place to stay: hotel, rental, hostel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accommodation {
    #[serde(default)]
    pub item_id: ItemId,
    #[serde(default)]
    pub trip: Option<TripId>,
    pub name: String,
    pub location: Location,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub price: f64,
    pub booking_confirmation_number: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl Accommodation {
    pub fn new(name: impl Into<String>, location: Location, check_in: NaiveDate, check_out: NaiveDate, price: f64) -> Self {
        Self {
            item_id: ItemId::new(),
            trip: None,
            name: name.into(),
            location,
            check_in,
            check_out,
            price,
            booking_confirmation_number: None,
            amenities: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days().max(0)
    }
}

impl_item!(Accommodation, location, |s| s.name.clone(), |s| Some(s.price));
