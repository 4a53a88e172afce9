//! [`GeocodingClient`] backed by the [Nominatim](https://nominatim.openstreetmap.org)
//! API of OpenStreetMap.
//!
//! Requests are spaced out to respect Nominatim's usage policy of at most one
//! request per second.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, instrument, warn};
use trip_planner_lib::{AddressComponents, Coordinate, Placemark};

use super::geocoding::{GeocodingClient, ProviderError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominatimConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Nominatim rejects requests without an identifying user agent.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Preferred language of returned names, sent as `accept-language`.
    #[serde(default = "default_language")]
    pub language: String,

    /// Maximum number of candidates per search
    #[serde(default = "default_result_limit")]
    pub result_limit: u32,

    /// Minimum spacing between two requests in milliseconds
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

fn default_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

const fn default_timeout_secs() -> u64 {
    5
}

fn default_user_agent() -> String {
    concat!("trip-planner/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_language() -> String {
    "en".to_string()
}

const fn default_result_limit() -> u32 {
    10
}

const fn default_min_request_interval_ms() -> u64 {
    1100
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            language: default_language(),
            result_limit: default_result_limit(),
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }
}

impl NominatimConfig {
    /// Talks to `base_url` without request spacing.
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            min_request_interval_ms: 0,
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct NominatimGeocodingClient {
    client: Client,
    config: NominatimConfig,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl NominatimGeocodingClient {
    pub fn new(config: &NominatimConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    async fn rate_limit(&self) {
        let interval = Duration::from_millis(self.config.min_request_interval_ms);
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                let wait = interval - elapsed;
                debug!(?wait, "Rate limiting geocoding request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Response, ProviderError> {
        self.rate_limit().await;

        let url = format!("{}/{path}", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("extratags", "1"),
                ("accept-language", self.config.language.as_str()),
            ])
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::ConnectionFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Nominatim answered with an error status");
            return Err(ProviderError::RequestFailed(format!("HTTP {}", response.status())));
        }

        Ok(response)
    }
}

#[async_trait]
impl GeocodingClient for NominatimGeocodingClient {
    #[instrument(skip(self))]
    async fn forward(&self, query: &str) -> Result<Vec<Placemark>, ProviderError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let params = [("q", query.to_string()), ("limit", self.config.result_limit.to_string())];
        let places: Vec<NominatimPlace> = self
            .get("search", &params)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let placemarks = places
            .into_iter()
            .map(NominatimPlace::into_placemark)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = placemarks.len(), "Geocoded query");
        Ok(placemarks)
    }

    #[instrument(skip(self))]
    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<Placemark>, ProviderError> {
        let params = [
            ("lat", coordinate.latitude.to_string()),
            ("lon", coordinate.longitude.to_string()),
        ];
        let response: ReverseResponse = self
            .get("reverse", &params)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        match response {
            ReverseResponse::Found(place) => place.into_placemark().map(Some),
            ReverseResponse::NotFound { error } => {
                debug!(%error, "Nothing found at coordinate");
                Ok(None)
            }
        }
    }
}

/// `/reverse` answers `{"error": "Unable to geocode"}` when nothing is there.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReverseResponse {
    Found(NominatimPlace),
    NotFound { error: String },
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: NominatimAddress,
    #[serde(default)]
    extratags: Option<NominatimExtraTags>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    house_number: Option<String>,
    road: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimExtraTags {
    phone: Option<String>,
    website: Option<String>,
}

impl NominatimPlace {
    fn into_placemark(self) -> Result<Placemark, ProviderError> {
        let latitude: f64 = self.lat.parse().map_err(|_| ProviderError::ParseError(format!("Invalid latitude {}", self.lat)))?;
        let longitude: f64 = self.lon.parse().map_err(|_| ProviderError::ParseError(format!("Invalid longitude {}", self.lon)))?;

        let address = self.address;
        let extratags = self.extratags.unwrap_or_default();

        Ok(Placemark {
            name: self.name.filter(|name| !name.trim().is_empty()),
            coordinate: Coordinate::new(latitude, longitude),
            address: AddressComponents {
                sub_thoroughfare: address.house_number,
                thoroughfare: address.road,
                locality: address.city.or(address.town).or(address.village),
                administrative_area: address.state,
                postal_code: address.postcode,
                country: address.country,
            },
            phone: extratags.phone,
            website: extratags.website,
        })
    }
}
