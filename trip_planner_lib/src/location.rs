use geo_types::Point;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

// geo-types points are x = longitude, y = latitude
impl From<Coordinate> for Point {
    fn from(value: Coordinate) -> Self {
        Point::new(value.longitude, value.latitude)
    }
}

impl From<Point> for Coordinate {
    fn from(value: Point) -> Self {
        Coordinate::new(value.y(), value.x())
    }
}

/// Where a trip item takes place: the free text address shown to the user plus
/// the coordinate it was resolved to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(address: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            address: address.into(),
            latitude,
            longitude,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Structured address parts as reported by a geocoding provider. Any part may be
/// missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressComponents {
    /// House number
    pub sub_thoroughfare: Option<String>,
    /// Street
    pub thoroughfare: Option<String>,
    /// City, town or village
    pub locality: Option<String>,
    /// State or region
    pub administrative_area: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl AddressComponents {
    /// Postal style rendering: "number street, city, state zip". Absent parts are
    /// left out together with their separators.
    pub fn postal_address(&self) -> String {
        let street = join_present([self.sub_thoroughfare.as_deref(), self.thoroughfare.as_deref()], " ");
        let region = join_present([self.administrative_area.as_deref(), self.postal_code.as_deref()], " ");

        join_present(
            [Some(street.as_str()), self.locality.as_deref(), Some(region.as_str())],
            ", ",
        )
    }
}

/// A single geocoding candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placemark {
    pub name: Option<String>,
    pub coordinate: Coordinate,
    pub address: AddressComponents,
    pub phone: Option<String>,
    pub website: Option<String>,
}

impl Placemark {
    pub fn new(name: Option<String>, coordinate: Coordinate) -> Self {
        Self {
            name,
            coordinate,
            address: AddressComponents::default(),
            phone: None,
            website: None,
        }
    }

    /// The text shown for a selected location: name, locality, administrative area
    /// and country joined by ", ". Missing or blank parts are skipped.
    pub fn display_name(&self) -> String {
        join_present(
            [
                self.name.as_deref(),
                self.address.locality.as_deref(),
                self.address.administrative_area.as_deref(),
                self.address.country.as_deref(),
            ],
            ", ",
        )
    }
}

/// A search result offered to the user during a location search. Lives only as
/// long as the search UI that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLocation {
    pub name: String,
    pub coordinate: Coordinate,
    pub placemark: Placemark,
}

impl From<Placemark> for SearchLocation {
    fn from(placemark: Placemark) -> Self {
        let name = match placemark.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => placemark.display_name(),
        };

        Self {
            name,
            coordinate: placemark.coordinate,
            placemark,
        }
    }
}

/// The outcome of a location pick: what to show and where it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationResult {
    pub display_text: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationResult {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl From<LocationResult> for Location {
    fn from(value: LocationResult) -> Self {
        Location::new(value.display_text, value.latitude, value.longitude)
    }
}

fn join_present<'a>(parts: impl IntoIterator<Item = Option<&'a str>>, separator: &str) -> String {
    parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eiffel_tower() -> Placemark {
        Placemark {
            name: Some("Eiffel Tower".into()),
            coordinate: Coordinate::new(48.8584, 2.2945),
            address: AddressComponents {
                sub_thoroughfare: Some("5".into()),
                thoroughfare: Some("Avenue Anatole France".into()),
                locality: Some("Paris".into()),
                administrative_area: Some("Île-de-France".into()),
                postal_code: Some("75007".into()),
                country: None,
            },
            phone: Some("+33 892 70 12 39".into()),
            website: Some("https://www.toureiffel.paris".into()),
        }
    }

    #[test]
    fn display_name_skips_absent_parts() {
        assert_eq!(eiffel_tower().display_name(), "Eiffel Tower, Paris, Île-de-France");
    }

    #[test]
    fn display_name_skips_blank_parts() {
        let mut placemark = eiffel_tower();
        placemark.name = Some("  ".into());
        placemark.address.country = Some("France".into());
        assert_eq!(placemark.display_name(), "Paris, Île-de-France, France");
    }

    #[test]
    fn display_name_of_empty_placemark_is_empty() {
        let placemark = Placemark::new(None, Coordinate::new(0., 0.));
        assert_eq!(placemark.display_name(), "");
    }

    #[test]
    fn postal_address_layout() {
        assert_eq!(
            eiffel_tower().address.postal_address(),
            "5 Avenue Anatole France, Paris, Île-de-France 75007"
        );

        let partial = AddressComponents {
            locality: Some("Aarhus".into()),
            postal_code: Some("8000".into()),
            ..Default::default()
        };
        assert_eq!(partial.postal_address(), "Aarhus, 8000");
    }

    #[test]
    fn search_location_falls_back_to_display_name() {
        let mut placemark = eiffel_tower();
        placemark.name = None;
        let location = SearchLocation::from(placemark);
        assert_eq!(location.name, "Paris, Île-de-France");
    }

    #[test]
    fn coordinate_point_axes() {
        let point: Point = Coordinate::new(56.15, 10.2).into();
        assert_eq!(point.x(), 10.2);
        assert_eq!(point.y(), 56.15);
        assert_eq!(Coordinate::from(point), Coordinate::new(56.15, 10.2));
    }

    #[test]
    fn coordinate_bounds() {
        assert!(Coordinate::new(89.9, -179.9).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 180.5).is_valid());
    }
}
