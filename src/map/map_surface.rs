use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::car_annotation::CarAnnotation;
use crate::coordinate::Coordinate;
use crate::utils;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Overlay {
    Polyline(Vec<Coordinate>),
}

/// Visible map region, spans are in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub center: Coordinate,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Region {
    pub fn around(center: Coordinate, span_meters: f64) -> Self {
        let (latitude_delta, longitude_delta) =
            utils::meters_to_degree_span(center.latitude, span_meters);
        Self {
            center,
            latitude_delta,
            longitude_delta,
        }
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (coordinate.latitude - self.center.latitude).abs() <= self.latitude_delta / 2.0
            && (coordinate.longitude - self.center.longitude).abs() <= self.longitude_delta / 2.0
    }
}

pub trait MapSurface: Send {
    /// Replaces every overlay currently on the map.
    fn replace_overlays(&mut self, overlays: Vec<Overlay>);

    fn remove_car_annotation(&mut self);

    fn add_car_annotation(&mut self, annotation: CarAnnotation);

    fn set_shows_user_location(&mut self, shows: bool);

    fn center_on(&mut self, center: Coordinate, span_meters: f64);
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub overlays: Vec<Overlay>,
    pub car_annotation: Option<CarAnnotation>,
    pub shows_user_location: bool,
    pub region: Option<Region>,
}

/// In-memory map surface the host renders from. Every mutation bumps the
/// version so the host only redraws when something changed.
pub struct MapState {
    snapshot: MapSnapshot,
    version: u64,
    car_refresh_count: u64,
    center_count: u64,
}

impl MapState {
    pub fn new() -> Self {
        Self {
            snapshot: MapSnapshot::default(),
            version: 0,
            car_refresh_count: 0,
            center_count: 0,
        }
    }

    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub fn get_current_version(&self) -> u64 {
        self.version
    }

    pub fn get_version_string(&self) -> String {
        format!("\"{:x}\"", self.version)
    }

    pub fn parse_version_string(version_str: &str) -> Option<u64> {
        let cleaned = version_str.trim_matches('"');
        u64::from_str_radix(cleaned, 16).ok()
    }

    pub fn get_latest_if_changed(
        &self,
        client_version: Option<&str>,
    ) -> Option<(&MapSnapshot, String)> {
        match client_version {
            Some(v_str) if Self::parse_version_string(v_str) == Some(self.version) => None,
            _ => Some((&self.snapshot, self.get_version_string())),
        }
    }

    pub fn snapshot(&self) -> &MapSnapshot {
        &self.snapshot
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.snapshot.overlays
    }

    pub fn car_annotation(&self) -> Option<&CarAnnotation> {
        self.snapshot.car_annotation.as_ref()
    }

    pub fn region(&self) -> Option<Region> {
        self.snapshot.region
    }

    /// How many times the car annotation was re-added.
    pub fn car_refresh_count(&self) -> u64 {
        self.car_refresh_count
    }

    pub fn center_count(&self) -> u64 {
        self.center_count
    }
}

impl MapSurface for MapState {
    fn replace_overlays(&mut self, overlays: Vec<Overlay>) {
        self.snapshot.overlays = overlays;
        self.touch();
    }

    fn remove_car_annotation(&mut self) {
        if self.snapshot.car_annotation.take().is_some() {
            self.touch();
        }
    }

    fn add_car_annotation(&mut self, annotation: CarAnnotation) {
        self.snapshot.car_annotation = Some(annotation);
        self.car_refresh_count += 1;
        self.touch();
    }

    fn set_shows_user_location(&mut self, shows: bool) {
        if self.snapshot.shows_user_location != shows {
            self.snapshot.shows_user_location = shows;
            self.touch();
        }
    }

    fn center_on(&mut self, center: Coordinate, span_meters: f64) {
        self.snapshot.region = Some(Region::around(center, span_meters));
        self.center_count += 1;
        self.touch();
    }
}

// lets the runtime own the surface while the host keeps reading it
impl<M: MapSurface> MapSurface for Arc<Mutex<M>> {
    fn replace_overlays(&mut self, overlays: Vec<Overlay>) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace_overlays(overlays)
    }

    fn remove_car_annotation(&mut self) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove_car_annotation()
    }

    fn add_car_annotation(&mut self, annotation: CarAnnotation) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_car_annotation(annotation)
    }

    fn set_shows_user_location(&mut self, shows: bool) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_shows_user_location(shows)
    }

    fn center_on(&mut self, center: Coordinate, span_meters: f64) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .center_on(center, span_meters)
    }
}
