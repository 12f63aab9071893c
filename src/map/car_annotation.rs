use serde::{Deserialize, Serialize};

use crate::coordinate::{Coordinate, Heading};

/// The car marker. It is never moved in place: every refresh removes the old
/// annotation and adds a new one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarAnnotation {
    pub coordinate: Coordinate,
    pub heading: Option<Heading>,
}

impl CarAnnotation {
    pub fn new(coordinate: Coordinate, heading: Option<Heading>) -> Self {
        Self {
            coordinate,
            heading,
        }
    }

    pub fn rotation_radians(&self) -> f64 {
        self.heading.map(|h| h.radians()).unwrap_or(0.0)
    }

    /// Row-major 2-D rotation matrix for the marker image.
    pub fn transform(&self) -> [[f64; 2]; 2] {
        let (sin, cos) = self.rotation_radians().sin_cos();
        [[cos, -sin], [sin, cos]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn rotation_follows_heading() {
        let car = CarAnnotation::new(Coordinate::new(0.0, 0.0), Some(Heading::from_degrees(90.0)));
        assert!((car.rotation_radians() - FRAC_PI_2).abs() < 1e-12);
        let [[a, b], [c, d]] = car.transform();
        assert!(a.abs() < 1e-12 && d.abs() < 1e-12);
        assert!((b + 1.0).abs() < 1e-12 && (c - 1.0).abs() < 1e-12);
    }

    #[test]
    fn no_heading_is_identity() {
        let car = CarAnnotation::new(Coordinate::new(0.0, 0.0), None);
        assert_eq!(car.transform(), [[1.0, 0.0], [0.0, 1.0]]);
    }
}
