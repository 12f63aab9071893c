use carnav_core::coordinate::{Coordinate, Heading};
use carnav_core::map::{CarAnnotation, MapState, MapSurface, Overlay, Region};

#[test]
fn version_string() {
    let mut map = MapState::new();
    let (_, version) = map.get_latest_if_changed(None).unwrap();
    assert_eq!(version, "\"0\"");
    assert!(map.get_latest_if_changed(Some(&version)).is_none());

    map.set_shows_user_location(true);
    let (snapshot, new_version) = map.get_latest_if_changed(Some(&version)).unwrap();
    assert!(snapshot.shows_user_location);
    assert_ne!(new_version, version);
    assert_eq!(
        MapState::parse_version_string(&new_version),
        Some(map.get_current_version())
    );

    // setting the same value again is not a change
    map.set_shows_user_location(true);
    assert!(map.get_latest_if_changed(Some(&new_version)).is_none());
}

#[test]
fn overlays_are_replaced_not_merged() {
    let mut map = MapState::new();
    let a = vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)];
    let b = vec![Coordinate::new(2.0, 2.0), Coordinate::new(3.0, 3.0)];
    map.replace_overlays(vec![Overlay::Polyline(a)]);
    map.replace_overlays(vec![Overlay::Polyline(b.clone())]);
    assert_eq!(map.overlays(), &[Overlay::Polyline(b)]);
}

#[test]
fn car_annotation_is_replaced() {
    let mut map = MapState::new();
    map.remove_car_annotation();
    assert_eq!(map.get_current_version(), 0);

    let car = CarAnnotation::new(Coordinate::new(1.0, 2.0), Some(Heading::from_degrees(45.0)));
    map.add_car_annotation(car.clone());
    map.remove_car_annotation();
    assert!(map.car_annotation().is_none());
    map.add_car_annotation(car.clone());
    assert_eq!(map.car_annotation(), Some(&car));
    assert_eq!(map.car_refresh_count(), 2);
}

#[test]
fn center_on_sets_a_region_of_the_given_span() {
    let mut map = MapState::new();
    let center = Coordinate::new(23.08, 72.53);
    map.center_on(center, 100.0);
    let region = map.region().unwrap();
    assert_eq!(region, Region::around(center, 100.0));
    assert!((region.latitude_delta - 100.0 / 111_320.0).abs() < 1e-12);
    assert!(region.longitude_delta > region.latitude_delta);
    assert!(region.contains(&center));
    assert!(!region.contains(&Coordinate::new(23.0805, 72.53)));
}
