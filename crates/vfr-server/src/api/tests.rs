use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use vfr_core::{
    AirportFacility, AirportKind, Airspace, AirspacePolygon, Catalog, Node, NodeCategory,
    Position, Runway,
};

use crate::{api, config::Config, elevation::ElevationService, state::AppState};

fn airport(id: &str, name: &str, lat: f64, lon: f64, fuel: bool) -> Node {
    Node {
        id: id.to_string(),
        name: name.to_string(),
        lat,
        lon,
        category: NodeCategory::Airport,
        elevation_ft: Some(20.0),
        airport: Some(AirportFacility {
            kind: AirportKind::Medium,
            private: false,
            fuel,
            runways: vec![Runway {
                length_m: 1400.0,
                surface: "ASP".to_string(),
                closed: false,
            }],
        }),
    }
}

fn restricted_area() -> Airspace {
    Airspace {
        name: "R-TEST".to_string(),
        class: "G".to_string(),
        category: "RESTRICTED".to_string(),
        lower_limit_ft: 0.0,
        polygons: AirspacePolygon::new(
            vec![
                Position::new(37.55, -122.20),
                Position::new(37.55, -122.12),
                Position::new(37.62, -122.12),
                Position::new(37.62, -122.20),
            ],
            Vec::new(),
        )
        .into_iter()
        .collect(),
    }
}

fn setup_app() -> axum::Router {
    let catalog = Catalog::new(
        vec![
            airport("KPAO", "Palo Alto", 37.4611, -122.1150, false),
            airport("KOAK", "Oakland International", 37.7213, -122.2208, true),
            airport("KHWD", "Hayward Executive", 37.6589, -122.1217, true),
            airport("KSQL", "San Carlos", 37.5119, -122.2495, false),
        ],
        vec![restricted_area()],
    );
    let config = Config::offline();
    let elevation = ElevationService::from_config(&config);
    let state = Arc::new(AppState::with_elevation(catalog, elevation, config));
    api::routes().with_state(state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_and_request_id() {
    let app = setup_app();
    let res = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("abc-123")
    );
}

#[tokio::test]
async fn airport_lookup_is_case_insensitive() {
    let app = setup_app();
    let res = app.clone().oneshot(get("/airport/kpao")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["icao"], "KPAO");
    assert_eq!(body["name"], "Palo Alto");

    let missing = app.oneshot(get("/airport/XXXX")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert!(read_json(missing).await["error"].is_string());
}

#[tokio::test]
async fn direct_route_has_no_diversions() {
    let app = setup_app();
    let res = app
        .oneshot(post_json(
            "/route",
            json!({
                "origin": "KPAO",
                "destination": "KOAK",
                "speed": 110,
                "speed_unit": "knots",
                "altitude": 5500,
                "avoid_airspaces": false,
                "avoid_terrain": false,
                "max_leg_distance": 500
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert!(body["distance_nm"].as_f64().unwrap() > 0.0);
    assert_eq!(body["overflown_airports"].as_array().unwrap().len(), 0);
    assert_eq!(body["route"][0], "KPAO");
    assert_eq!(body["origin_coords"]["lat"], 37.4611);
    for segment in body["segments"].as_array().unwrap() {
        let altitude = segment["vfr_altitude_ft"].as_i64().unwrap();
        assert!(altitude >= 3500 && altitude % 1000 == 0);
    }
}

#[tokio::test]
async fn short_legs_insert_diversions() {
    let app = setup_app();
    let res = app
        .oneshot(post_json(
            "/route",
            json!({
                "origin": "KPAO",
                "destination": "KOAK",
                "speed": 100,
                "altitude": 5500,
                "max_leg_distance": 10
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    let overflown = body["overflown_airports"].as_array().unwrap();
    assert!(!overflown.is_empty());
    assert_eq!(overflown.len(), body["overflown_coords"].as_array().unwrap().len());
    assert_eq!(overflown.len(), body["overflown_names"].as_array().unwrap().len());
}

#[tokio::test]
async fn airspace_avoidance_reports_clean_or_capped() {
    let app = setup_app();
    let res = app
        .oneshot(post_json(
            "/route",
            json!({
                "origin": "KPAO",
                "destination": "KOAK",
                "speed": 100,
                "altitude": 5500,
                "avoid_airspaces": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    let route: Vec<&str> = body["route"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(route.first(), Some(&"KPAO"));
    assert_eq!(route.last(), Some(&"KOAK"));

    let area = restricted_area();
    let position = |value: &Value| {
        Position::new(
            value["lat"].as_f64().unwrap(),
            value["lon"].as_f64().unwrap(),
        )
    };
    let crossing = body["segments"]
        .as_array()
        .unwrap()
        .iter()
        .any(|segment| area.intersects_segment(position(&segment["start"]), position(&segment["end"])));
    assert!(!crossing || body["detour_capped"] == true);
}

#[tokio::test]
async fn unknown_origin_returns_error_only() {
    let app = setup_app();
    let res = app
        .oneshot(post_json(
            "/route",
            json!({"origin": "XXXX", "destination": "KOAK", "speed": 100, "altitude": 5500}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = read_json(res).await;
    assert!(body["error"].is_string());
    assert!(body.get("route").is_none());
    assert!(body.get("segments").is_none());
}

#[tokio::test]
async fn invalid_leg_limit_is_bad_request() {
    let app = setup_app();
    let res = app
        .oneshot(post_json(
            "/route",
            json!({"origin": "KPAO", "destination": "KOAK", "speed": 100, "altitude": 5500, "max_leg_distance": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn nearest_airport_honours_filters() {
    let app = setup_app();
    let res = app
        .clone()
        .oneshot(get("/airports/nearest?lat=37.46&lon=-122.11"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["icao"], "KPAO");

    let res = app
        .clone()
        .oneshot(get("/airports/nearest?lat=37.46&lon=-122.11&fuel_only=true&exclude=khwd"))
        .await
        .unwrap();
    assert_eq!(read_json(res).await["icao"], "KOAK");

    let res = app
        .oneshot(get("/airports/nearest?lat=123&lon=-122.11"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn airspaces_filtered_by_bbox() {
    let app = setup_app();
    let res = app
        .clone()
        .oneshot(get("/airspaces?min_lat=37.5&min_lon=-122.3&max_lat=37.7&max_lon=-122.0"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["type"], "FeatureCollection");
    assert_eq!(body["features"].as_array().unwrap().len(), 1);
    assert_eq!(body["features"][0]["properties"]["name"], "R-TEST");

    let res = app
        .clone()
        .oneshot(get("/airspaces?min_lat=40&min_lon=-100&max_lat=41&max_lon=-99"))
        .await
        .unwrap();
    assert_eq!(read_json(res).await["features"].as_array().unwrap().len(), 0);

    let res = app
        .oneshot(get("/airspaces?min_lat=41&min_lon=-100&max_lat=40&max_lon=-99"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn terrain_profile_offline_is_sea_level() {
    let app = setup_app();
    let res = app
        .oneshot(post_json(
            "/terrain-profile",
            json!({"points": [[37.46, -122.11], [37.72, -122.22]]}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    let samples = body.as_array().unwrap();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0]["elevation"], 0.0);
    assert_eq!(samples[1]["lat"], 37.72);
}
