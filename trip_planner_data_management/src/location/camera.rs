use serde::{Deserialize, Serialize};
use trip_planner_lib::Coordinate;

/// What the map shows: a center and how far away the camera is, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub center: Option<Coordinate>,
    pub distance_m: f64,
}

impl CameraState {
    pub fn new(distance_m: f64) -> Self {
        Self {
            center: None,
            distance_m,
        }
    }

    pub fn center_on(&mut self, coordinate: Coordinate) {
        self.center = Some(coordinate);
    }

    /// Halves the view distance and re-centers on `selected`. Without a selection
    /// nothing changes. Returns whether the camera moved.
    pub fn zoom_in(&mut self, selected: Option<Coordinate>) -> bool {
        self.zoom(selected, 0.5)
    }

    /// Doubles the view distance and re-centers on `selected`. Without a selection
    /// nothing changes. Returns whether the camera moved.
    pub fn zoom_out(&mut self, selected: Option<Coordinate>) -> bool {
        self.zoom(selected, 2.0)
    }

    fn zoom(&mut self, selected: Option<Coordinate>, factor: f64) -> bool {
        let Some(selected) = selected else {
            return false;
        };

        self.center = Some(selected);
        self.distance_m *= factor;
        true
    }
}
