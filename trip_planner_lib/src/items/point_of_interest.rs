use serde::{Deserialize, Serialize};

use super::impl_item;
use crate::{ids::{ItemId, TripId}, location::Location};

labelled_enum! {
    pub enum PoiCategory {
        Historical => ("historical", "Historical"),
        Natural => ("natural", "Natural"),
        Cultural => ("cultural", "Cultural"),
        Recreational => ("recreational", "Recreational"),
        Other => ("other", "Other"),
    }
}

/// A landmark, museum, park or anything else worth a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    #[serde(default)]
    pub item_id: ItemId,
    #[serde(default)]
    pub trip: Option<TripId>,
    pub name: String,
    pub location: Location,
    pub category: PoiCategory,
    pub opening_hours: Option<Vec<String>>,
    pub entry_fee: Option<f64>,
    pub recommended_visit_minutes: u32,
    #[serde(default)]
    pub notes: String,
}

impl PointOfInterest {
    pub fn new(name: impl Into<String>, location: Location, category: PoiCategory, recommended_visit_minutes: u32) -> Self {
        Self {
            item_id: ItemId::new(),
            trip: None,
            name: name.into(),
            location,
            category,
            opening_hours: None,
            entry_fee: None,
            recommended_visit_minutes,
            notes: String::new(),
        }
    }
}

impl_item!(PointOfInterest, location, |s| s.name.clone(), |s| s.entry_fee);
