//! Directions backed by an OSRM-compatible HTTP service (`route/v1` API).
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use super::route_provider::{Route, RouteFailure, RouteFuture, RouteProvider, TransportMode};
use crate::config::OsrmConfig;
use crate::coordinate::Coordinate;

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: Option<f64>,
    duration: Option<f64>,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    // [lng, lat] pairs
    coordinates: Vec<[f64; 2]>,
}

pub struct OsrmRouteProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OsrmRouteProvider {
    pub fn new(config: &OsrmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn route_url(&self, from: &Coordinate, to: &Coordinate, mode: TransportMode) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, mode, from.longitude, from.latitude, to.longitude, to.latitude
        )
    }
}

impl RouteProvider for OsrmRouteProvider {
    fn compute_route(&self, from: Coordinate, to: Coordinate, mode: TransportMode) -> RouteFuture {
        let client = self.client.clone();
        let url = self.route_url(&from, &to, mode);
        Box::pin(async move {
            debug!("requesting route: {}", url);
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| RouteFailure::Network(e.to_string()))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| RouteFailure::Network(e.to_string()))?;
            // OSRM reports "no route" as a JSON body with a 4xx status, so the
            // body is looked at before the status.
            match parse_route_response(&body) {
                Err(RouteFailure::InvalidResponse(_)) if !status.is_success() => {
                    Err(RouteFailure::Network(format!("HTTP {status}")))
                }
                result => result,
            }
        })
    }
}

pub fn parse_route_response(body: &str) -> Result<Route, RouteFailure> {
    let response: OsrmResponse =
        serde_json::from_str(body).map_err(|e| RouteFailure::InvalidResponse(e.to_string()))?;
    if response.code != "Ok" {
        debug!(
            "directions service answered {}: {}",
            response.code,
            response.message.as_deref().unwrap_or_default()
        );
        return Err(RouteFailure::NoRoute);
    }
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(RouteFailure::NoRoute)?;

    let coordinates: Vec<Coordinate> = route
        .geometry
        .coordinates
        .iter()
        .map(|[lng, lat]| Coordinate::new(*lat, *lng))
        .collect();
    if coordinates.len() < 2 {
        return Err(RouteFailure::InvalidResponse(format!(
            "route geometry has {} point(s)",
            coordinates.len()
        )));
    }
    if let Some(bad) = coordinates.iter().find(|c| !c.is_valid()) {
        return Err(RouteFailure::InvalidResponse(format!(
            "invalid coordinate in geometry: {bad:?}"
        )));
    }

    Ok(Route {
        coordinates,
        distance_meters: route.distance,
        expected_travel_time_secs: route.duration,
    })
}
