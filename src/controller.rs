use std::time::Duration;

use serde::Serialize;
use strum_macros::Display;

use crate::config::Config;
use crate::coordinate::{Coordinate, Heading, UserPosition};
use crate::landmark::{Landmark, ProximityMonitor, ProximityOutcome};
use crate::location_source::{LocationFailure, RawData};
use crate::map::{CarAnimator, CarAnnotation, MapSurface, Overlay};
use crate::routing::{Route, RouteFailure, TransportMode};

/// Whether the map follows the user. The display string is the label of the
/// toggle button.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, Serialize)]
pub enum AutoCenterMode {
    #[strum(to_string = "Auto-Center: On")]
    On,
    #[strum(to_string = "Auto-Center: Off")]
    Off,
}

impl AutoCenterMode {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            AutoCenterMode::On
        } else {
            AutoCenterMode::Off
        }
    }

    pub fn is_on(&self) -> bool {
        *self == AutoCenterMode::On
    }

    pub fn toggled(&self) -> Self {
        match self {
            AutoCenterMode::On => AutoCenterMode::Off,
            AutoCenterMode::Off => AutoCenterMode::On,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouteRequest {
    pub generation: u64,
    pub from: Coordinate,
    pub to: Coordinate,
    pub mode: TransportMode,
}

/// What the host UI needs to draw everything outside the map itself.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewState {
    pub auto_center: AutoCenterMode,
    pub toggle_label: String,
    pub proximity_alert: Option<String>,
    pub has_route: bool,
    pub car_animation_active: bool,
    pub user_position: UserPosition,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            auto_center: AutoCenterMode::Off,
            toggle_label: AutoCenterMode::Off.to_string(),
            proximity_alert: None,
            has_route: false,
            car_animation_active: false,
            user_position: UserPosition::default(),
        }
    }
}

struct ActiveRoute {
    generation: u64,
    route: Route,
}

pub struct AppController {
    proximity: ProximityMonitor,
    center_span_meters: f64,
    shows_user_location: bool,
    discard_stale_routes: bool,
    car_speed_mps: f64,
    user_position: UserPosition,
    auto_center: AutoCenterMode,
    active_route: Option<ActiveRoute>,
    car_animator: Option<CarAnimator>,
    last_generation: u64,
}

impl AppController {
    pub fn new(config: &Config) -> Self {
        Self {
            proximity: ProximityMonitor::new(config.landmark(), config.proximity_threshold_meters),
            center_span_meters: config.center_span_meters,
            shows_user_location: config.shows_user_location,
            discard_stale_routes: config.discard_stale_routes,
            car_speed_mps: config.car_animation.speed_mps,
            user_position: UserPosition::default(),
            auto_center: AutoCenterMode::from_enabled(config.auto_center_on_start),
            active_route: None,
            car_animator: None,
            last_generation: 0,
        }
    }

    /// Puts the surface into its initial state.
    pub fn attach(&mut self, map: &mut dyn MapSurface) {
        map.set_shows_user_location(self.shows_user_location);
        map.replace_overlays(Vec::new());
        map.remove_car_annotation();
    }

    pub fn landmark(&self) -> &Landmark {
        self.proximity.landmark()
    }

    pub fn auto_center(&self) -> AutoCenterMode {
        self.auto_center
    }

    pub fn user_position(&self) -> &UserPosition {
        &self.user_position
    }

    pub fn is_proximity_alert_shown(&self) -> bool {
        self.proximity.is_alert_shown()
    }

    pub fn active_route(&self) -> Option<&Route> {
        self.active_route.as_ref().map(|active| &active.route)
    }

    pub fn is_car_animation_active(&self) -> bool {
        self.car_animator
            .as_ref()
            .is_some_and(|animator| !animator.is_finished())
    }

    /// Handles a new fix. Returns the route request to issue for it, `None`
    /// when the fix has no usable coordinate.
    pub fn on_location_update(
        &mut self,
        raw_data: &RawData,
        map: &mut dyn MapSurface,
    ) -> Option<RouteRequest> {
        let Some(position) = raw_data.coordinate() else {
            debug!(
                "dropping fix without a usable coordinate: {}, {}",
                raw_data.latitude, raw_data.longitude
            );
            return None;
        };
        self.user_position.coordinate = Some(position);

        if self.auto_center.is_on() {
            map.center_on(position, self.center_span_meters);
        }

        if self.proximity.observe(&position) == ProximityOutcome::Triggered {
            info!("proximity alert raised for {}", self.landmark().name);
        }

        // the car waits at the fix until the route from here arrives
        self.car_animator = None;
        self.refresh_car_annotation(map);

        self.last_generation += 1;
        Some(RouteRequest {
            generation: self.last_generation,
            from: position,
            to: self.landmark().coordinate,
            mode: TransportMode::Driving,
        })
    }

    pub fn on_heading_update(&mut self, raw_degrees: f64, map: &mut dyn MapSurface) {
        self.user_position.heading = Heading::from_raw(raw_degrees);
        self.refresh_car_annotation(map);
    }

    pub fn on_location_failure(&mut self, failure: &LocationFailure) {
        warn!("location update failed: {}", failure);
    }

    /// Applies a finished route computation. Returns whether the displayed
    /// route changed.
    pub fn on_route_resolved(
        &mut self,
        generation: u64,
        result: Result<Route, RouteFailure>,
        map: &mut dyn MapSurface,
    ) -> bool {
        let route = match result {
            Ok(route) => route,
            Err(failure) => {
                warn!("route #{} failed, keeping the current one: {}", generation, failure);
                return false;
            }
        };

        if self.discard_stale_routes {
            if let Some(active) = &self.active_route {
                if active.generation >= generation {
                    info!(
                        "dropping stale route #{} (showing #{})",
                        generation, active.generation
                    );
                    return false;
                }
            }
        }

        debug!(
            "route #{}: {} points, {:.0}m",
            generation,
            route.coordinates.len(),
            route
                .distance_meters
                .unwrap_or_else(|| route.polyline_length_meters())
        );
        map.replace_overlays(vec![Overlay::Polyline(route.coordinates.clone())]);
        self.car_animator = CarAnimator::new(&route);
        self.active_route = Some(ActiveRoute { generation, route });
        self.refresh_car_annotation(map);
        true
    }

    /// Flips the auto-center mode. Nothing else happens until the next fix.
    pub fn on_toggle_auto_center(&mut self) -> AutoCenterMode {
        self.auto_center = self.auto_center.toggled();
        info!("auto-center is now {:?}", self.auto_center);
        self.auto_center
    }

    pub fn dismiss_proximity_alert(&mut self) {
        self.proximity.dismiss();
    }

    /// Moves the car along the active route. Returns whether it moved.
    pub fn on_animation_tick(&mut self, elapsed: Duration, map: &mut dyn MapSurface) -> bool {
        let Some(animator) = self.car_animator.as_mut() else {
            return false;
        };
        if animator.is_finished() {
            return false;
        }
        animator.advance(self.car_speed_mps * elapsed.as_secs_f64());
        if animator.is_finished() {
            debug!("car reached the end of the route");
        }
        self.refresh_car_annotation(map);
        true
    }

    // the annotation is re-created rather than moved
    fn refresh_car_annotation(&self, map: &mut dyn MapSurface) {
        let (coordinate, heading) = match &self.car_animator {
            Some(animator) => (
                Some(animator.position()),
                animator.bearing().or(self.user_position.heading),
            ),
            None => (self.user_position.coordinate, self.user_position.heading),
        };
        let Some(coordinate) = coordinate else {
            return;
        };
        map.remove_car_annotation();
        map.add_car_annotation(CarAnnotation::new(coordinate, heading));
    }

    pub fn view_state(&self) -> ViewState {
        ViewState {
            auto_center: self.auto_center,
            toggle_label: self.auto_center.to_string(),
            proximity_alert: self.proximity.alert_message(),
            has_route: self.active_route.is_some(),
            car_animation_active: self.is_car_animation_active(),
            user_position: self.user_position.clone(),
        }
    }
}
