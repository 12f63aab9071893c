use itertools::Itertools;

use crate::coordinate::{Coordinate, Heading};
use crate::routing::Route;

/// Moves the car marker along a route polyline at a constant pace.
pub struct CarAnimator {
    points: Vec<Coordinate>,
    /* distance from the first point to each point, same length as `points` */
    cumulative_meters: Vec<f64>,
    travelled_meters: f64,
}

impl CarAnimator {
    /// `None` for a route without any point.
    pub fn new(route: &Route) -> Option<Self> {
        if route.coordinates.is_empty() {
            return None;
        }
        let points = route.coordinates.clone();
        let mut cumulative_meters = Vec::with_capacity(points.len());
        cumulative_meters.push(0.0);
        for (a, b) in points.iter().tuple_windows() {
            let last = *cumulative_meters.last().unwrap_or(&0.0);
            cumulative_meters.push(last + a.distance_to(b));
        }
        Some(Self {
            points,
            cumulative_meters,
            travelled_meters: 0.0,
        })
    }

    pub fn total_meters(&self) -> f64 {
        *self.cumulative_meters.last().unwrap_or(&0.0)
    }

    pub fn travelled_meters(&self) -> f64 {
        self.travelled_meters
    }

    pub fn is_finished(&self) -> bool {
        self.travelled_meters >= self.total_meters()
    }

    pub fn advance(&mut self, meters: f64) -> Coordinate {
        if meters.is_finite() && meters > 0.0 {
            self.travelled_meters = (self.travelled_meters + meters).min(self.total_meters());
        }
        self.position()
    }

    // index of the segment the car is on
    fn segment_index(&self) -> usize {
        let idx = self
            .cumulative_meters
            .partition_point(|d| *d <= self.travelled_meters);
        idx.saturating_sub(1).min(self.points.len().saturating_sub(2))
    }

    pub fn position(&self) -> Coordinate {
        if self.points.len() == 1 || self.is_finished() {
            return self.points[self.points.len() - 1];
        }
        let i = self.segment_index();
        let segment_len = self.cumulative_meters[i + 1] - self.cumulative_meters[i];
        if segment_len <= 0.0 {
            return self.points[i];
        }
        let t = (self.travelled_meters - self.cumulative_meters[i]) / segment_len;
        self.points[i].lerp(&self.points[i + 1], t)
    }

    /// Direction of the segment the car is on.
    pub fn bearing(&self) -> Option<Heading> {
        if self.points.len() < 2 {
            return None;
        }
        let i = self.segment_index();
        let (a, b) = (self.points[i], self.points[i + 1]);
        if a == b {
            None
        } else {
            Some(a.bearing_to(&b))
        }
    }
}
