use std::{sync::Arc, time::Duration};

use geo::{Distance, Haversine, Point};
use parking_lot::Mutex;
use tokio::{sync::broadcast, task::AbortHandle};
use tracing::{debug, info, warn};
use trip_planner_lib::{Coordinate, LocationResult, SearchLocation};

use super::{
    camera::CameraState,
    debouncer::{DebouncerState, SearchDebouncer},
    geocoding::{GeocodingClient, ProviderError, ResolutionFailed},
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub quiet_period: Duration,
    pub initial_view_distance_m: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(500),
            initial_view_distance_m: 10_000.0,
        }
    }
}

/// Changes a session reports to its subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    CandidatesUpdated(Vec<SearchLocation>),
    SelectionChanged(LocationResult),
    ResolutionFailed(ResolutionFailed),
}

/// How a map tap ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TapOutcome {
    /// The provider named the place.
    Resolved(LocationResult),
    /// Nothing known at the coordinate. The coordinate is kept with the previous
    /// display text.
    Unresolved(LocationResult),
    /// A later search, tap or selection took over before the lookup finished.
    Superseded,
}

#[derive(Debug)]
struct SessionState {
    /// Bumped by every operation that supersedes earlier lookups. A lookup may only
    /// apply its result while this still equals the value it started with.
    latest_request: u64,
    candidates: Vec<SearchLocation>,
    selection: Option<LocationResult>,
    camera: CameraState,
    tap: Option<AbortHandle>,
    last_failure: Option<ResolutionFailed>,
}

impl SessionState {
    fn supersede(&mut self) -> u64 {
        self.latest_request += 1;
        self.abort_tap();
        self.latest_request
    }

    fn abort_tap(&mut self) {
        if let Some(tap) = self.tap.take() {
            tap.abort();
        }
    }
}

/// Drives search and map picking for one location field.
///
/// Search results arrive asynchronously and are announced through
/// [`subscribe`](Self::subscribe). Results of superseded lookups are dropped, so a
/// late answer never overwrites a newer one.
pub struct LocationResolutionSession {
    geocoder: Arc<dyn GeocodingClient>,
    debouncer: SearchDebouncer,
    state: Arc<Mutex<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
}

impl LocationResolutionSession {
    pub fn new(geocoder: Arc<dyn GeocodingClient>, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            geocoder,
            debouncer: SearchDebouncer::new(config.quiet_period),
            state: Arc::new(Mutex::new(SessionState {
                latest_request: 0,
                candidates: Vec::new(),
                selection: None,
                camera: CameraState::new(config.initial_view_distance_m),
                tap: None,
                last_failure: None,
            })),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Searches for `text` once typing pauses. Blank text clears the candidates
    /// right away without asking the provider.
    pub fn search(&self, text: &str) {
        let query = text.trim();

        if query.is_empty() {
            self.debouncer.cancel_all();
            let cleared = {
                let mut state = self.state.lock();
                state.supersede();
                !std::mem::take(&mut state.candidates).is_empty()
            };
            if cleared {
                self.emit(SessionEvent::CandidatesUpdated(Vec::new()));
            }
            return;
        }

        // The debounced lookup supersedes older ones once it starts. Bumping here would
        // also discard a running lookup for this very text.
        self.state.lock().abort_tap();

        let geocoder = self.geocoder.clone();
        let state = self.state.clone();
        let events = self.events.clone();

        self.debouncer.on_query_changed(query, move |query| async move {
            let request = state.lock().supersede();
            debug!(%query, "Searching locations");

            let result = geocoder.forward(&query).await;

            let mut state = state.lock();
            if state.latest_request != request {
                debug!(%query, "Dropping superseded search result");
                return;
            }

            let event = match result {
                Ok(placemarks) => {
                    let candidates = rank(placemarks.into_iter().map(SearchLocation::from).collect(), state.camera.center);
                    state.candidates = candidates.clone();
                    state.last_failure = None;
                    SessionEvent::CandidatesUpdated(candidates)
                }
                Err(cause) => {
                    warn!(%query, %cause, "Location search failed");
                    let failure = ResolutionFailed::from(cause);
                    state.last_failure = Some(failure.clone());
                    SessionEvent::ResolutionFailed(failure)
                }
            };
            drop(state);

            let _ = events.send(event);
        });
    }

    /// The current search candidates, closest to the camera center first.
    pub fn candidates(&self) -> Vec<SearchLocation> {
        self.state.lock().candidates.clone()
    }

    /// Makes `candidate` the selection, clears the candidate list and centers the
    /// camera on it.
    pub fn select_candidate(&self, candidate: &SearchLocation) -> LocationResult {
        self.debouncer.cancel_all();

        let display_text = match candidate.placemark.display_name() {
            text if text.is_empty() => candidate.name.clone(),
            text => text,
        };
        let result = LocationResult {
            display_text,
            latitude: candidate.coordinate.latitude,
            longitude: candidate.coordinate.longitude,
        };

        {
            let mut state = self.state.lock();
            state.supersede();
            state.selection = Some(result.clone());
            state.candidates.clear();
            state.camera.center_on(candidate.coordinate);
            state.last_failure = None;
        }

        info!(display_text = %result.display_text, "Selected search candidate");
        self.emit(SessionEvent::SelectionChanged(result.clone()));
        result
    }

    /// Selects the tapped coordinate and asks the provider what is there.
    ///
    /// A provider failure leaves the previous selection untouched and is returned as
    /// [`ResolutionFailed`].
    pub async fn select_from_map_tap(&self, coordinate: Coordinate) -> Result<TapOutcome, ResolutionFailed> {
        self.debouncer.cancel_all();

        let (request, task) = {
            let mut state = self.state.lock();
            let request = state.supersede();
            let geocoder = self.geocoder.clone();
            let task = tokio::spawn(async move { geocoder.reverse(coordinate).await });
            state.tap = Some(task.abort_handle());
            (request, task)
        };

        let result = match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => return Ok(TapOutcome::Superseded),
            Err(e) => Err(ProviderError::RequestFailed(e.to_string())),
        };

        let mut state = self.state.lock();
        if state.latest_request != request {
            debug!("Dropping superseded reverse lookup");
            return Ok(TapOutcome::Superseded);
        }
        state.tap = None;

        let placemark = match result {
            Ok(placemark) => placemark,
            Err(cause) => {
                warn!(%cause, "Reverse lookup failed");
                let failure = ResolutionFailed::from(cause);
                state.last_failure = Some(failure.clone());
                drop(state);

                self.emit(SessionEvent::ResolutionFailed(failure.clone()));
                return Err(failure);
            }
        };

        let resolved_text = placemark.map(|placemark| placemark.display_name()).filter(|text| !text.is_empty());
        let resolved = resolved_text.is_some();
        let result = LocationResult {
            display_text: resolved_text
                .or_else(|| state.selection.as_ref().map(|previous| previous.display_text.clone()))
                .unwrap_or_default(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        };

        state.selection = Some(result.clone());
        state.last_failure = None;
        drop(state);

        info!(display_text = %result.display_text, resolved, "Selected map coordinate");
        self.emit(SessionEvent::SelectionChanged(result.clone()));

        Ok(if resolved {
            TapOutcome::Resolved(result)
        } else {
            TapOutcome::Unresolved(result)
        })
    }

    /// The last selection, if any.
    pub fn current_result(&self) -> Option<LocationResult> {
        self.state.lock().selection.clone()
    }

    pub fn camera(&self) -> CameraState {
        self.state.lock().camera
    }

    pub fn zoom_in(&self) -> CameraState {
        let mut state = self.state.lock();
        let selected = state.selection.as_ref().map(LocationResult::coordinate);
        state.camera.zoom_in(selected);
        state.camera
    }

    pub fn zoom_out(&self) -> CameraState {
        let mut state = self.state.lock();
        let selected = state.selection.as_ref().map(LocationResult::coordinate);
        state.camera.zoom_out(selected);
        state.camera
    }

    /// The failure of the most recent lookup, cleared by the next success.
    pub fn last_failure(&self) -> Option<ResolutionFailed> {
        self.state.lock().last_failure.clone()
    }

    pub fn debouncer_state(&self) -> DebouncerState {
        self.debouncer.state()
    }

    /// Cancels the pending search and any lookup in flight. Their results are
    /// discarded.
    pub fn cancel_all(&self) {
        self.debouncer.cancel_all();
        self.state.lock().supersede();
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Drop for LocationResolutionSession {
    fn drop(&mut self) {
        if let Some(tap) = self.state.lock().tap.take() {
            tap.abort();
        }
    }
}

/// Orders candidates by great-circle distance from `center`. Provider order breaks
/// ties and is kept as is without a center.
fn rank(mut candidates: Vec<SearchLocation>, center: Option<Coordinate>) -> Vec<SearchLocation> {
    let Some(center) = center else {
        return candidates;
    };

    let origin = Point::from(center);
    let distance = |candidate: &SearchLocation| Haversine.distance(origin, Point::from(candidate.coordinate));
    candidates.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
    candidates
}
