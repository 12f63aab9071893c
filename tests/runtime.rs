pub mod test_utils;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carnav_core::config::Config;
use carnav_core::controller::ViewState;
use carnav_core::location_source::{
    HostLocationSource, LocationEvent, LocationFailure, ReplayLocationSource,
};
use carnav_core::map::{MapState, Overlay};
use carnav_core::coordinate::Coordinate;
use carnav_core::routing::{
    FixedRouteProvider, Route, RouteFailure, RouteFuture, RouteProvider, TransportMode,
};
use carnav_core::runtime::AppRuntime;
use tokio::sync::watch;
use tokio::time::timeout;
use test_utils::*;

async fn wait_for(
    view_state: &mut watch::Receiver<ViewState>,
    f: impl FnMut(&ViewState) -> bool,
) -> ViewState {
    timeout(Duration::from_secs(5), view_state.wait_for(f))
        .await
        .expect("timed out waiting for view state")
        .expect("runtime stopped")
        .clone()
}

#[tokio::test]
async fn far_fix_draws_a_route() {
    init_logger();
    let map = Arc::new(Mutex::new(MapState::new()));
    let provider = FixedRouteProvider::direct();
    let handle = AppRuntime::new(&config(), map.clone(), Arc::new(provider.clone()))
        .spawn()
        .unwrap();
    let mut view_state = handle.subscribe();

    handle
        .send_location(LocationEvent::Position(raw(FAR)))
        .unwrap();
    let state = wait_for(&mut view_state, |s| s.has_route).await;
    assert!(state.proximity_alert.is_none());
    assert_eq!(state.user_position.coordinate, Some(coordinate(FAR)));
    assert_eq!(provider.request_count(), 1);

    {
        let map = map.lock().unwrap();
        assert_eq!(
            map.overlays(),
            &[Overlay::Polyline(vec![coordinate(FAR), LANDMARK])]
        );
        assert_eq!(map.region().unwrap().center, coordinate(FAR));
    }

    let route = handle.active_route().await.unwrap().unwrap();
    assert_eq!(route.coordinates, vec![coordinate(FAR), LANDMARK]);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn close_fix_raises_the_alert_until_dismissed() {
    init_logger();
    let map = Arc::new(Mutex::new(MapState::new()));
    let provider = FixedRouteProvider::always(Err(RouteFailure::NoRoute));
    let handle = AppRuntime::new(&config(), map.clone(), Arc::new(provider))
        .spawn()
        .unwrap();

    handle
        .send_location(LocationEvent::Position(raw(NEAR)))
        .unwrap();
    handle
        .send_location(LocationEvent::Failed(LocationFailure::SignalLost))
        .unwrap();
    handle
        .send_location(LocationEvent::Position(raw(FAR)))
        .unwrap();
    let state = handle.snapshot().await.unwrap();
    assert!(state.proximity_alert.is_some());

    handle.dismiss_proximity_alert().unwrap();
    let state = handle.snapshot().await.unwrap();
    assert!(state.proximity_alert.is_none());

    // every route failed, nothing is drawn
    assert!(!state.has_route);
    assert!(map.lock().unwrap().overlays().is_empty());
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn toggle_is_serialized_with_location_updates() {
    let map = Arc::new(Mutex::new(MapState::new()));
    let handle = AppRuntime::new(&config(), map.clone(), Arc::new(FixedRouteProvider::direct()))
        .spawn()
        .unwrap();

    handle.toggle_auto_center().unwrap();
    handle
        .send_location(LocationEvent::Position(raw(FAR)))
        .unwrap();
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.toggle_label, "Auto-Center: Off");
    assert_eq!(map.lock().unwrap().center_count(), 0);

    handle.toggle_auto_center().unwrap();
    handle
        .send_location(LocationEvent::Position(raw(FAR)))
        .unwrap();
    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.toggle_label, "Auto-Center: On");
    assert_eq!(map.lock().unwrap().center_count(), 1);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn car_is_animated_towards_the_landmark() {
    let config = Config {
        car_animation: carnav_core::config::CarAnimationConfig {
            tick_ms: 5,
            speed_mps: 100_000.0,
        },
        ..config()
    };
    let map = Arc::new(Mutex::new(MapState::new()));
    let handle = AppRuntime::new(&config, map.clone(), Arc::new(FixedRouteProvider::direct()))
        .spawn()
        .unwrap();
    let mut view_state = handle.subscribe();

    handle
        .send_location(LocationEvent::Position(raw(FAR)))
        .unwrap();
    wait_for(&mut view_state, |s| s.has_route).await;
    let state = wait_for(&mut view_state, |s| s.has_route && !s.car_animation_active).await;
    assert!(state.has_route);
    assert_eq!(map.lock().unwrap().car_annotation().unwrap().coordinate, LANDMARK);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn one_shot_request_goes_to_the_location_source() {
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = requests.clone();
    let source = HostLocationSource::with_request_once_hook(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let handle = AppRuntime::new(
        &config(),
        MapState::new(),
        Arc::new(FixedRouteProvider::direct()),
    )
    .with_location_source(source)
    .spawn()
    .unwrap();

    handle.request_location_once().unwrap();
    handle.snapshot().await.unwrap();
    assert_eq!(requests.load(Ordering::SeqCst), 1);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn replayed_track_reaches_the_landmark() {
    init_logger();
    let track = vec![raw(FAR), raw(OUTSIDE_EDGE), raw(NEAR)];
    let map = Arc::new(Mutex::new(MapState::new()));
    let handle = AppRuntime::new(&config(), map.clone(), Arc::new(FixedRouteProvider::direct()))
        .with_location_source(ReplayLocationSource::new(track, Duration::from_millis(10)))
        .spawn()
        .unwrap();
    let mut view_state = handle.subscribe();

    let state = wait_for(&mut view_state, |s| s.proximity_alert.is_some()).await;
    assert_eq!(state.user_position.coordinate, Some(coordinate(NEAR)));
    // replay derives a heading from consecutive fixes
    let state = handle.snapshot().await.unwrap();
    assert!(state.user_position.heading.is_some());

    // a one-shot request re-emits the last fix
    handle.dismiss_proximity_alert().unwrap();
    assert!(handle.snapshot().await.unwrap().proximity_alert.is_none());
    handle.request_location_once().unwrap();
    wait_for(&mut view_state, |s| s.proximity_alert.is_some()).await;
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn handle_fails_after_shutdown() {
    let handle = AppRuntime::new(
        &config(),
        MapState::new(),
        Arc::new(FixedRouteProvider::direct()),
    )
    .spawn()
    .unwrap();
    let sink = handle.location_sink();
    handle.shutdown().await.unwrap();
    assert!(!sink.send(LocationEvent::Heading(10.0)));
}

#[tokio::test]
async fn dropping_every_handle_stops_the_runtime() {
    let track = vec![raw(FAR), raw(OUTSIDE_EDGE), raw(NEAR)];
    let handle = AppRuntime::new(
        &config(),
        MapState::new(),
        Arc::new(FixedRouteProvider::direct()),
    )
    .with_location_source(ReplayLocationSource::new(track, Duration::from_secs(3600)))
    .spawn()
    .unwrap();
    let mut view_state = handle.subscribe();
    let sink = handle.location_sink();
    view_state.borrow_and_update();

    drop(handle);
    let stopped = timeout(Duration::from_secs(2), async {
        while view_state.changed().await.is_ok() {}
    })
    .await;
    assert!(stopped.is_ok(), "runtime kept running without handles");
    assert!(!sink.send(LocationEvent::Heading(10.0)));
}

/// Resolves each request after the next delay in line, so a later request can
/// finish first.
struct DelayedRouteProvider {
    delays: Mutex<VecDeque<Duration>>,
}

impl DelayedRouteProvider {
    fn new(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: Mutex::new(delays.into_iter().collect()),
        }
    }
}

impl RouteProvider for DelayedRouteProvider {
    fn compute_route(&self, from: Coordinate, to: Coordinate, _: TransportMode) -> RouteFuture {
        let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(Route::from_coordinates(vec![from, to]))
        })
    }
}

async fn resolve_out_of_order(config: &Config) -> Route {
    let provider = DelayedRouteProvider::new([Duration::from_millis(300), Duration::ZERO]);
    let handle = AppRuntime::new(config, MapState::new(), Arc::new(provider))
        .spawn()
        .unwrap();
    let mut view_state = handle.subscribe();

    handle
        .send_location(LocationEvent::Position(raw(FAR)))
        .unwrap();
    handle
        .send_location(LocationEvent::Position(raw(OUTSIDE_EDGE)))
        .unwrap();
    wait_for(&mut view_state, |s| s.has_route).await;
    // let the slow, older request come back too
    tokio::time::sleep(Duration::from_millis(600)).await;
    handle.snapshot().await.unwrap();

    let route = handle.active_route().await.unwrap().unwrap();
    handle.shutdown().await.unwrap();
    route
}

#[tokio::test]
async fn older_route_resolving_late_is_dropped() {
    let route = resolve_out_of_order(&config()).await;
    assert_eq!(route.coordinates, vec![coordinate(OUTSIDE_EDGE), LANDMARK]);
}

#[tokio::test]
async fn older_route_resolving_late_wins_when_stale_routes_are_kept() {
    let config = Config {
        discard_stale_routes: false,
        ..config()
    };
    let route = resolve_out_of_order(&config).await;
    assert_eq!(route.coordinates, vec![coordinate(FAR), LANDMARK]);
}
