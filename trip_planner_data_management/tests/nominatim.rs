//! Nominatim adapter against a mocked server

use std::{sync::Arc, time::Duration};

use trip_planner_data_management::{
    GeocodingClient, LocationResolutionSession, NominatimConfig, NominatimGeocodingClient, ProviderError, SessionConfig,
    SessionEvent, TapOutcome,
};
use trip_planner_lib::Coordinate;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const fn search_json() -> &'static str {
    r#"[
        {
            "place_id": 88066702,
            "lat": "48.8582599",
            "lon": "2.2945006",
            "name": "Tour Eiffel",
            "display_name": "Tour Eiffel, 5, Avenue Anatole France, Paris, Île-de-France, 75007, France",
            "address": {
                "house_number": "5",
                "road": "Avenue Anatole France",
                "city": "Paris",
                "state": "Île-de-France",
                "postcode": "75007",
                "country": "France"
            },
            "extratags": { "website": "https://www.toureiffel.paris" }
        },
        {
            "place_id": 12345,
            "lat": "36.1162",
            "lon": "-115.1745",
            "name": "Eiffel Tower",
            "address": { "city": "Las Vegas", "state": "Nevada", "country": "United States" },
            "extratags": null
        }
    ]"#
}

const fn reverse_json() -> &'static str {
    r#"{
        "place_id": 1,
        "lat": "55.6761",
        "lon": "12.5683",
        "name": "Rådhuspladsen",
        "address": { "road": "Rådhuspladsen", "city": "København", "country": "Danmark" }
    }"#
}

fn client(server: &MockServer) -> NominatimGeocodingClient {
    NominatimGeocodingClient::new(&NominatimConfig::for_testing(server.uri())).unwrap()
}

#[tokio::test]
async fn forward_maps_every_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "eiffel tower"))
        .and(query_param("format", "jsonv2"))
        .and(query_param("addressdetails", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_json()))
        .expect(1)
        .mount(&server)
        .await;

    let placemarks = client(&server).forward("  eiffel tower ").await.unwrap();

    assert_eq!(placemarks.len(), 2);
    assert_eq!(placemarks[0].display_name(), "Tour Eiffel, Paris, Île-de-France, France");
    assert_eq!(placemarks[0].website.as_deref(), Some("https://www.toureiffel.paris"));
    assert_eq!(placemarks[1].address.locality.as_deref(), Some("Las Vegas"));
}

#[tokio::test]
async fn blank_query_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;

    assert!(client(&server).forward("   ").await.unwrap().is_empty());
}

#[tokio::test]
async fn reverse_finds_a_place() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "55.6761"))
        .and(query_param("lon", "12.5683"))
        .respond_with(ResponseTemplate::new(200).set_body_string(reverse_json()))
        .mount(&server)
        .await;

    let placemark = client(&server).reverse(Coordinate::new(55.6761, 12.5683)).await.unwrap().unwrap();

    assert_eq!(placemark.display_name(), "Rådhuspladsen, København, Danmark");
}

#[tokio::test]
async fn reverse_error_body_is_no_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"error": "Unable to geocode"}"#))
        .mount(&server)
        .await;

    let placemark = client(&server).reverse(Coordinate::new(0.0, -30.0)).await.unwrap();
    assert!(placemark.is_none());
}

#[tokio::test]
async fn server_error_is_a_request_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client(&server).forward("paris").await;
    assert!(matches!(result, Err(ProviderError::RequestFailed(_))));
}

#[tokio::test]
async fn garbage_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;

    let result = client(&server).forward("paris").await;
    assert!(matches!(result, Err(ProviderError::ParseError(_))));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = NominatimConfig {
        timeout_secs: 1,
        ..NominatimConfig::for_testing(server.uri())
    };
    let result = NominatimGeocodingClient::new(&config).unwrap().forward("paris").await;
    assert!(matches!(result, Err(ProviderError::Timeout)));
}

#[tokio::test]
async fn requests_are_spaced_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(2)
        .mount(&server)
        .await;

    let config = NominatimConfig {
        min_request_interval_ms: 300,
        ..NominatimConfig::for_testing(server.uri())
    };
    let client = NominatimGeocodingClient::new(&config).unwrap();

    let start = std::time::Instant::now();
    client.forward("a").await.unwrap();
    client.forward("b").await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn session_searches_and_taps_through_nominatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_json()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_string(reverse_json()))
        .mount(&server)
        .await;

    let config = SessionConfig {
        quiet_period: Duration::from_millis(50),
        ..SessionConfig::default()
    };
    let session = LocationResolutionSession::new(Arc::new(client(&server)), config);
    let mut events = session.subscribe();

    session.search("eif");
    session.search("eiffel tower");

    let candidates = match tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap() {
        SessionEvent::CandidatesUpdated(candidates) => candidates,
        other => panic!("unexpected event {other:?}"),
    };
    assert_eq!(candidates.len(), 2);

    let chosen = session.select_candidate(&candidates[0]);
    assert_eq!(chosen.display_text, "Tour Eiffel, Paris, Île-de-France, France");

    let outcome = session.select_from_map_tap(Coordinate::new(55.6761, 12.5683)).await.unwrap();
    assert!(matches!(outcome, TapOutcome::Resolved(ref r) if r.display_text == "Rådhuspladsen, København, Danmark"));
}
