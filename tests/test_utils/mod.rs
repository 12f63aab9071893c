#![allow(dead_code)]

use carnav_core::config::Config;
use carnav_core::coordinate::Coordinate;
use carnav_core::location_source::RawData;
use carnav_core::routing::Route;

pub const LANDMARK: Coordinate = Coordinate::new(23.071653, 72.516995);

// ~11m from the landmark
pub const NEAR: (f64, f64) = (23.0717, 72.5169);
// ~1.6km from the landmark
pub const FAR: (f64, f64) = (23.0800, 72.5300);
// just inside / just outside of 100m
pub const INSIDE_EDGE: (f64, f64) = (23.0725, 72.5170);
pub const OUTSIDE_EDGE: (f64, f64) = (23.0726, 72.5170);

pub fn raw(position: (f64, f64)) -> RawData {
    RawData::new(position.0, position.1)
}

pub fn raw_at(position: (f64, f64), timestamp_ms: i64) -> RawData {
    RawData {
        timestamp_ms: Some(timestamp_ms),
        ..RawData::new(position.0, position.1)
    }
}

pub fn coordinate(position: (f64, f64)) -> Coordinate {
    Coordinate::new(position.0, position.1)
}

pub fn straight_route(from: (f64, f64), to: Coordinate, points: usize) -> Route {
    let from = coordinate(from);
    let coordinates = (0..points)
        .map(|i| {
            if i == points - 1 {
                to
            } else {
                from.lerp(&to, i as f64 / (points - 1) as f64)
            }
        })
        .collect();
    Route::from_coordinates(coordinates)
}

pub fn config() -> Config {
    Config::default()
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
