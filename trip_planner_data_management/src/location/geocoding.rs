use async_trait::async_trait;
use thiserror::Error;
use trip_planner_lib::{Coordinate, Placemark};

/// Errors from a geocoding provider. Always recoverable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Geocoding connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Geocoding request failed: {0}")]
    RequestFailed(String),

    #[error("Geocoding parse error: {0}")]
    ParseError(String),

    #[error("Geocoding request timed out")]
    Timeout,
}

/// A provider failure as reported by a location session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("location could not be resolved: {cause}")]
pub struct ResolutionFailed {
    #[source]
    pub cause: ProviderError,
}

impl From<ProviderError> for ResolutionFailed {
    fn from(cause: ProviderError) -> Self {
        Self { cause }
    }
}

/// Forward and reverse geocoding against an external provider.
#[async_trait]
pub trait GeocodingClient: Send + Sync {
    /// Candidate places for a free text query, best match first.
    async fn forward(&self, query: &str) -> Result<Vec<Placemark>, ProviderError>;

    /// The place at `coordinate`, or `None` if the provider knows nothing there.
    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<Placemark>, ProviderError>;
}
