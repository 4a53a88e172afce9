use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::impl_item;
use crate::{ids::{ItemId, TripId}, location::Location};

labelled_enum! {
    pub enum EventCategory {
        Concert => ("concert", "Concert"),
        Festival => ("festival", "Festival"),
        Sports => ("sports", "Sports"),
        Theater => ("theater", "Theater"),
        Other => ("other", "Other"),
    }
}

/// A ticketed happening with a fixed start and end: concerts, games, shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub item_id: ItemId,
    #[serde(default)]
    pub trip: Option<TripId>,
    pub name: String,
    pub location: Location,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub category: EventCategory,
    pub ticket_price: f64,
    pub ticket_confirmation_number: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        location: Location,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        category: EventCategory,
        ticket_price: f64,
    ) -> Self {
        Self {
            item_id: ItemId::new(),
            trip: None,
            name: name.into(),
            location,
            start,
            end,
            category,
            ticket_price,
            ticket_confirmation_number: None,
            notes: String::new(),
        }
    }
}

impl_item!(Event, location, |s| s.name.clone(), |s| Some(s.ticket_price));
