#![allow(clippy::unwrap_used)]
// Integration tests for controller/zone refresh, commands, and write
// convergence using wiremock.

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skydrop_api::{ApiClient, ClientCredentials};
use skydrop_core::{Client, Controller, Convergence, ConvergencePolicy, CoreError};

const POLICY: ConvergencePolicy = ConvergencePolicy {
    poll_interval: Duration::from_millis(10),
    timeout: Duration::from_millis(200),
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config_body(controller_on: bool, zones: &Value) -> Value {
    json!({
        "controller_data": { "name": "Front Yard", "on": controller_on },
        "zones_data": zones
    })
}

fn default_zones() -> Value {
    json!([
        { "zone_num": 1, "name": "Lawn", "on": true, "duration": 10, "plant": "grass" },
        { "zone_num": "2", "on": false, "duration": 5 },
        { "name": "missing zone number" }
    ])
}

/// Mount the discovery listing plus one initial `all.config` and
/// `water.state` answer (consumed by the first refresh), then discover.
async fn setup() -> (MockServer, Client) {
    let server = MockServer::start().await;
    let api = ApiClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        ClientCredentials::new("app-id", "app-secret"),
    );
    let mut client = Client::with_api(api, POLICY);

    Mock::given(method("GET"))
        .and(path("/users/get.controller.ids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "controller_ids": [{ "public_controller_id": "c1", "name": "Front" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/controllers/c1/all.config"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(config_body(false, &default_zones())),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/controllers/c1/water.state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "zone_states": [
                { "zone_id": 1, "zone_watering": true, "time_remaining": 8 },
                { "zone_id": 9, "zone_watering": true, "time_remaining": 1 }
            ]
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    client.discover_controllers().await.unwrap();
    (server, client)
}

fn controller(client: &mut Client) -> &mut Controller {
    client.controller_mut("c1").unwrap()
}

async fn count_requests(server: &MockServer, http_method: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == http_method && r.url.path() == request_path)
        .count()
}

async fn mount_config(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/controllers/c1/all.config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Refresh ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_builds_zones_and_state() {
    let (_server, mut client) = setup().await;
    let c = controller(&mut client);

    assert_eq!(c.name(), Some("Front Yard"));
    assert!(!c.is_enabled());

    let ids: Vec<u32> = c.zones().iter().map(|z| z.id()).collect();
    assert_eq!(ids, vec![1, 2]);

    let lawn = c.zone(1).unwrap();
    assert_eq!(lawn.name(), "Lawn");
    assert!(lawn.enabled());
    assert_eq!(lawn.duration(), 10);
    assert_eq!(lawn.plants(), vec!["grass"]);
    assert!(lawn.watering());
    assert_eq!(lawn.time_remaining(), 8);

    let second = c.zone(2).unwrap();
    assert_eq!(second.name(), "Zone 2");
    assert!(!second.watering());

    assert!(c.zone(9).is_none());
    assert_eq!(c.zone_states().len(), 2);
}

#[tokio::test]
async fn test_refresh_updates_zones_in_place_and_never_drops_them() {
    let (server, mut client) = setup().await;

    mount_config(
        &server,
        config_body(
            true,
            &json!([{ "zone_num": 1, "name": "Lawn (north)", "on": false, "duration": 12 }]),
        ),
    )
    .await;

    let c = controller(&mut client);
    c.refresh_data().await.unwrap();

    assert!(c.is_enabled());
    assert_eq!(c.zones().len(), 2);
    let lawn = c.zone(1).unwrap();
    assert_eq!(lawn.name(), "Lawn (north)");
    assert!(!lawn.enabled());
    assert_eq!(lawn.duration(), 12);
    // Zone 2 is absent from the response but kept with its last snapshot.
    assert_eq!(c.zone(2).unwrap().duration(), 5);
}

#[tokio::test]
async fn test_unsuccessful_state_keeps_cached_zone_states() {
    let (server, mut client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/controllers/c1/water.state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let c = controller(&mut client);
    let before = c.zone_states().to_vec();
    c.refresh_state().await.unwrap();

    assert_eq!(c.zone_states(), before.as_slice());
    assert!(c.zone(1).unwrap().watering());
    assert_eq!(c.zone(1).unwrap().time_remaining(), 8);
}

#[tokio::test]
async fn test_state_refresh_replaces_zone_state() {
    let (server, mut client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/controllers/c1/water.state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "zone_states": [{ "zone_id": 2, "zone_watering": true, "time_remaining": 3 }]
        })))
        .mount(&server)
        .await;

    let c = controller(&mut client);
    c.refresh_state().await.unwrap();

    assert_eq!(c.zone_states().len(), 1);
    assert!(c.zone(2).unwrap().watering());
    assert_eq!(c.zone(2).unwrap().time_remaining(), 3);
}

#[tokio::test]
async fn test_zone_refresh_reloads_owning_controller() {
    let (server, mut client) = setup().await;

    mount_config(
        &server,
        config_body(
            false,
            &json!([{ "zone_num": 2, "name": "Beds", "on": true, "duration": 7 }]),
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/controllers/c1/water.state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "zone_states": [{ "zone_id": 2, "zone_watering": true, "time_remaining": 6 }]
        })))
        .mount(&server)
        .await;

    let c = controller(&mut client);
    let mut zone = c.zone_control(2).unwrap();
    zone.refresh().await.unwrap();

    let refreshed = zone.zone().unwrap();
    assert_eq!(refreshed.name(), "Beds");
    assert!(refreshed.enabled());
    assert_eq!(refreshed.duration(), 7);
    assert!(refreshed.watering());
    assert_eq!(refreshed.time_remaining(), 6);

    assert_eq!(count_requests(&server, "GET", "/controllers/c1/all.config").await, 2);
    assert_eq!(count_requests(&server, "GET", "/controllers/c1/water.state").await, 2);
}

// ── Watering commands ───────────────────────────────────────────────

#[tokio::test]
async fn test_start_watering_refreshes_state_on_success() {
    let (server, mut client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/controllers/c1/zones/2/water.zone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/controllers/c1/water.state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "zone_states": [{ "zone_id": 2, "zone_watering": true, "time_remaining": 5 }]
        })))
        .mount(&server)
        .await;

    let c = controller(&mut client);
    let mut zone = c.zone_control(2).unwrap();
    assert!(zone.start_watering().await.unwrap());
    assert!(zone.zone().unwrap().watering());

    assert_eq!(count_requests(&server, "GET", "/controllers/c1/water.state").await, 2);
}

#[tokio::test]
async fn test_stop_watering_without_marker_returns_false() {
    let (server, mut client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/controllers/c1/water.stop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "offline" })))
        .mount(&server)
        .await;

    let c = controller(&mut client);
    assert!(!c.stop_watering().await.unwrap());
    // No state refresh when the command was not accepted.
    assert_eq!(count_requests(&server, "GET", "/controllers/c1/water.state").await, 1);
}

#[tokio::test]
async fn test_watering_command_transport_error_propagates() {
    let (server, mut client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/controllers/c1/water.stop"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let result = controller(&mut client).stop_watering().await;
    assert!(
        matches!(
            result,
            Err(CoreError::Api(skydrop_api::Error::TooManyRequests { .. }))
        ),
        "expected TooManyRequests, got: {result:?}"
    );
}

// ── Convergence ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_enable_acknowledged_immediately_skips_polling() {
    let (server, mut client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/controllers/c1/controller.config"))
        .and(body_json(json!({ "on": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = controller(&mut client).enable().await.unwrap();
    assert_eq!(outcome, Convergence::Acknowledged);
    assert_eq!(count_requests(&server, "GET", "/controllers/c1/all.config").await, 1);
}

#[tokio::test]
async fn test_enable_converges_after_one_poll() {
    let (server, mut client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/controllers/c1/controller.config"))
        .and(body_json(json!({ "on": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .expect(1)
        .mount(&server)
        .await;
    mount_config(&server, config_body(true, &default_zones())).await;

    let c = controller(&mut client);
    let outcome = c.enable().await.unwrap();

    assert_eq!(outcome, Convergence::Converged { polls: 1 });
    assert!(outcome.is_confirmed());
    assert!(c.is_enabled());
    assert_eq!(count_requests(&server, "GET", "/controllers/c1/all.config").await, 2);
}

#[tokio::test]
async fn test_set_name_times_out_within_budget() {
    let (server, mut client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/controllers/c1/controller.config"))
        .and(body_json(json!({ "name": "Side Yard" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    mount_config(&server, config_body(false, &default_zones())).await;

    let c = controller(&mut client);
    let start = Instant::now();
    let outcome = c.set_name("Side Yard").await.unwrap();
    let elapsed = start.elapsed();

    assert!(!outcome.is_confirmed());
    let polls = outcome.polls();
    assert!(polls >= 1);
    assert!(polls <= 21, "polled {polls} times");
    assert!(elapsed >= POLICY.timeout);
    assert!(elapsed < POLICY.timeout + POLICY.poll_interval + Duration::from_secs(2));

    // One initial refresh plus exactly one fetch per poll.
    let fetches = count_requests(&server, "GET", "/controllers/c1/all.config").await;
    assert_eq!(fetches, 1 + usize::try_from(polls).unwrap());

    // The snapshot keeps whatever the last poll observed.
    assert_eq!(c.name(), Some("Front Yard"));

    match outcome.into_result() {
        Err(CoreError::NotConverged { target, pending, .. }) => {
            assert_eq!(target, "controller c1");
            assert_eq!(pending, vec!["name"]);
        }
        other => panic!("expected NotConverged, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_zone_duration_converges_after_one_poll() {
    let (server, mut client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/controllers/c1/zone.config/1"))
        .and(body_json(json!({ "duration": 25 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .expect(1)
        .mount(&server)
        .await;
    mount_config(
        &server,
        config_body(false, &json!([{ "zone_num": 1, "name": "Lawn", "on": true, "duration": 25 }])),
    )
    .await;

    let c = controller(&mut client);
    let outcome = c.zone_control(1).unwrap().set_duration(25).await.unwrap();

    assert_eq!(outcome, Convergence::Converged { polls: 1 });
    assert_eq!(c.zone(1).unwrap().duration(), 25);
}

#[tokio::test]
async fn test_zone_disable_acknowledged() {
    let (server, mut client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/controllers/c1/zone.config/1"))
        .and(body_json(json!({ "on": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let c = controller(&mut client);
    let outcome = c.zone_control(1).unwrap().disable().await.unwrap();
    assert_eq!(outcome, Convergence::Acknowledged);
}

#[tokio::test]
async fn test_unknown_zone_is_rejected_without_request() {
    let (server, mut client) = setup().await;

    let c = controller(&mut client);
    assert!(c.zone_control(42).is_none());

    let result = c.configure_zone(42, skydrop_core::ZonePatch::on(true)).await;
    assert!(
        matches!(result, Err(CoreError::ZoneNotFound { zone: 42, .. })),
        "expected ZoneNotFound, got: {result:?}"
    );
    assert_eq!(count_requests(&server, "PUT", "/controllers/c1/zone.config/42").await, 0);
}

#[tokio::test]
async fn test_write_error_propagates() {
    let (server, mut client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/controllers/c1/controller.config"))
        .respond_with(ResponseTemplate::new(403).set_body_string("not yours"))
        .mount(&server)
        .await;

    let result = controller(&mut client).disable().await;
    assert!(
        matches!(result, Err(CoreError::Api(skydrop_api::Error::Forbidden { .. }))),
        "expected Forbidden, got: {result:?}"
    );
}
