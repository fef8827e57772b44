//! Behavioural tests for [`allocate`] over [`OsrmTravelTimeProvider`].

use std::cell::RefCell;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;
use teamroute_core::{
    Allocation, AllocationError, Coordinate, DayCapacity, Job, Team, TravelTimeError, Worker,
    allocate,
};
use teamroute_data::routing::{OsrmConfig, OsrmTravelTimeProvider};
use tokio::runtime::Runtime;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

// Fields drop in order, so the runtime outlives the mock server.
struct World {
    server: RefCell<Option<MockServer>>,
    outcome: RefCell<Option<Result<Allocation, AllocationError>>>,
    runtime: Runtime,
}

#[fixture]
fn world() -> World {
    World {
        server: RefCell::new(None),
        outcome: RefCell::new(None),
        runtime: tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime"),
    }
}

fn point(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).expect("valid coordinate")
}

// --- Given steps ---

#[given("an OSRM table service that omits durations")]
fn table_without_durations(#[from(world)] world: &World) {
    let server = world.runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": "Ok" })))
            .mount(&server)
            .await;
        server
    });
    *world.server.borrow_mut() = Some(server);
}

// --- When steps ---

#[when("I allocate three jobs between two workers")]
fn allocate_three_jobs(#[from(world)] world: &World) {
    let server = world.server.borrow();
    let server = server.as_ref().expect("server must be started");
    let provider = OsrmTravelTimeProvider::with_config(
        OsrmConfig::new(server.uri()).with_timeout(Duration::from_secs(2)),
    )
    .expect("provider should build");
    let team = Team::new(vec![
        Worker::new("w1", "Alice", point(51.501, -0.1416), "#1f77b4"),
        Worker::new("w2", "Bob", point(53.477, -2.2309), "#ff7f0e"),
    ])
    .expect("valid team");
    let jobs = vec![
        Job::resolved("j1", "EC1A 1BB", point(51.520, -0.0977)),
        Job::resolved("j2", "M2 5PD", point(53.481, -2.2374)),
        Job::resolved("j3", "SE1 7PB", point(51.503, -0.1195)),
    ];
    let outcome = world
        .runtime
        .block_on(allocate(&provider, &team, &jobs, DayCapacity::default()));
    *world.outcome.borrow_mut() = Some(outcome);
}

// --- Then steps ---

#[then("the allocation fails with a malformed routing response")]
fn malformed_routing_failure(#[from(world)] world: &World) {
    let outcome = world
        .outcome
        .borrow_mut()
        .take()
        .expect("allocation must have run");
    match outcome {
        Err(AllocationError::Routing(TravelTimeError::MalformedResponse { .. })) => {}
        Err(other) => panic!("expected a malformed routing response, found {other:?}"),
        Ok(allocation) => panic!("expected no allocation, found {allocation:?}"),
    }
}

#[then("the table service was queried once")]
fn queried_once(#[from(world)] world: &World) {
    let server = world.server.borrow();
    let server = server.as_ref().expect("server must be started");
    let requests = world
        .runtime
        .block_on(server.received_requests())
        .expect("request recording is enabled");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.path().starts_with("/table/v1/driving/"));
}

#[scenario(
    path = "tests/features/osrm_allocation.feature",
    name = "a table response without durations fails the allocation"
)]
fn missing_durations_fail_allocation(world: World) {
    let _ = world;
}
