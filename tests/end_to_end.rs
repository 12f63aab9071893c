pub mod test_utils;

use carnav_core::api::api;
use carnav_core::config::Config;
use carnav_core::location_source::LocationFailure;
use carnav_core::routing::FixedRouteProvider;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempdir::TempDir;
use test_utils::*;

fn wait_until(f: impl Fn(&carnav_core::controller::ViewState) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let state = api::get_view_state().unwrap();
        if f(&state) {
            return;
        }
        assert!(Instant::now() < deadline, "timed out, last state: {state:?}");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn basic() {
    let temp_dir = TempDir::new("end_to_end-basic").unwrap();
    println!("temp dir: {:?}", temp_dir.path());
    let cache_dir = temp_dir.path().join("cache/");
    fs::create_dir(&cache_dir).unwrap();
    let cache_dir = cache_dir.into_os_string().into_string().unwrap();

    assert!(api::get_view_state().is_err());

    api::set_log_sink(|line| println!("[host] {line}"));

    let config = Config::from_json_str(r#"{"log_level": "debug"}"#).unwrap();
    api::init_with_route_provider(
        cache_dir.clone(),
        config,
        Arc::new(FixedRouteProvider::direct()),
    )
    .unwrap();
    // a second init is ignored
    api::init_with_route_provider(
        cache_dir,
        Config::default(),
        Arc::new(FixedRouteProvider::direct()),
    )
    .unwrap();

    let requests = Arc::new(AtomicUsize::new(0));
    let request_counter = requests.clone();
    api::set_location_request_handler(move || {
        request_counter.fetch_add(1, Ordering::SeqCst);
    });
    api::request_location_once().unwrap();

    // nothing exported before a route exists
    let route_path = temp_dir.path().join("route.gpx");
    assert!(!api::export_active_route(route_path.to_str().unwrap().to_string()).unwrap());

    // out of order batch, the far fix is the latest one
    api::on_location_update(vec![raw_at(FAR, 2000), raw_at(OUTSIDE_EDGE, 1000)]).unwrap();
    api::on_heading_update(45.0).unwrap();
    api::on_location_error(LocationFailure::PermissionDenied).unwrap();
    wait_until(|s| s.has_route);

    let state = api::get_view_state().unwrap();
    assert_eq!(state.user_position.coordinate, Some(coordinate(FAR)));
    assert_eq!(state.user_position.heading.unwrap().degrees(), 45.0);
    assert!(state.proximity_alert.is_none());
    assert_eq!(requests.load(Ordering::SeqCst), 1);

    let (snapshot, version) = api::get_map_snapshot_if_changed(None).unwrap().unwrap();
    assert_eq!(snapshot.overlays.len(), 1);
    assert!(snapshot.car_annotation.is_some());

    api::toggle_auto_center().unwrap();
    assert_eq!(api::get_view_state().unwrap().toggle_label, "Auto-Center: Off");
    // the car keeps moving, so only an unknown version is guaranteed to differ
    assert!(api::get_map_snapshot_if_changed(Some("\"bogus\"".to_string()))
        .unwrap()
        .is_some());
    assert!(!version.is_empty());

    assert!(api::export_active_route(route_path.to_str().unwrap().to_string()).unwrap());
    assert!(fs::metadata(&route_path).unwrap().len() > 0);

    api::on_location_update(vec![raw(NEAR)]).unwrap();
    wait_until(|s| s.proximity_alert.is_some());
    api::dismiss_proximity_alert().unwrap();
    assert!(api::get_view_state().unwrap().proximity_alert.is_none());
    assert!(api::peek_view_state().unwrap().proximity_alert.is_none());

    let logs_path = temp_dir.path().join("logs.zip");
    api::export_logs(logs_path.to_str().unwrap().to_string()).unwrap();
    assert!(fs::metadata(&logs_path).unwrap().len() > 0);
    assert!(temp_dir.path().join("cache/logs").is_dir());
}
