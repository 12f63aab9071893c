use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use geo_types::{Coord, LineString};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::coordinate::Coordinate;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum TransportMode {
    Driving,
}

/// A polyline from the user towards the landmark, as returned by the
/// directions service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub coordinates: Vec<Coordinate>,
    pub distance_meters: Option<f64>,
    pub expected_travel_time_secs: Option<f64>,
}

impl Route {
    pub fn from_coordinates(coordinates: Vec<Coordinate>) -> Self {
        Self {
            coordinates,
            distance_meters: None,
            expected_travel_time_secs: None,
        }
    }

    /// Length of the polyline itself, regardless of what the provider reported.
    pub fn polyline_length_meters(&self) -> f64 {
        self.coordinates
            .iter()
            .tuple_windows()
            .map(|(a, b)| a.distance_to(b))
            .sum()
    }

    pub fn to_line_string(&self) -> LineString<f64> {
        self.coordinates
            .iter()
            .map(|c| Coord {
                x: c.longitude,
                y: c.latitude,
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RouteFailure {
    #[error("directions request failed: {0}")]
    Network(String),
    #[error("no route found")]
    NoRoute,
    #[error("invalid directions response: {0}")]
    InvalidResponse(String),
}

pub type RouteFuture = Pin<Box<dyn Future<Output = Result<Route, RouteFailure>> + Send>>;

pub trait RouteProvider: Send + Sync {
    /// Starts computing a route. A new call never cancels a previous one.
    fn compute_route(&self, from: Coordinate, to: Coordinate, mode: TransportMode) -> RouteFuture;
}

type RouteFn = dyn Fn(Coordinate, Coordinate, TransportMode) -> Result<Route, RouteFailure>
    + Send
    + Sync;

/// Answers every request synchronously from a function. Useful for hosts
/// whose platform already produced the route, and for tests.
#[derive(Clone)]
pub struct FixedRouteProvider {
    route_fn: Arc<RouteFn>,
    request_count: Arc<AtomicUsize>,
}

impl FixedRouteProvider {
    pub fn from_fn(
        f: impl Fn(Coordinate, Coordinate, TransportMode) -> Result<Route, RouteFailure>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            route_fn: Arc::new(f),
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn always(result: Result<Route, RouteFailure>) -> Self {
        Self::from_fn(move |_, _, _| result.clone())
    }

    /// A two-point route straight from the source to the destination.
    pub fn direct() -> Self {
        Self::from_fn(|from, to, _| Ok(Route::from_coordinates(vec![from, to])))
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

impl RouteProvider for FixedRouteProvider {
    fn compute_route(&self, from: Coordinate, to: Coordinate, mode: TransportMode) -> RouteFuture {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        let result = (self.route_fn)(from, to, mode);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_mode_names() {
        assert_eq!(TransportMode::Driving.to_string(), "driving");
        assert_eq!("driving".parse::<TransportMode>().unwrap(), TransportMode::Driving);
    }

    #[test]
    fn line_string_is_lng_lat() {
        let route = Route::from_coordinates(vec![
            Coordinate::new(23.0, 72.0),
            Coordinate::new(23.1, 72.1),
        ]);
        let line = route.to_line_string();
        assert_eq!(line.0[0], Coord { x: 72.0, y: 23.0 });
        assert_eq!(line.0.len(), 2);
    }
}
