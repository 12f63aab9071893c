use geo_types::Point;
use serde::{Deserialize, Serialize};

// mean earth radius (IUGG)
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lng = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
    }

    /// Initial bearing towards `other`, degrees clockwise from true north.
    pub fn bearing_to(&self, other: &Coordinate) -> Heading {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lng = (other.longitude - self.longitude).to_radians();

        let y = d_lng.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();
        Heading::from_degrees(y.atan2(x).to_degrees())
    }

    /// Linear interpolation, good enough for the short segments of a route.
    pub fn lerp(&self, other: &Coordinate, t: f64) -> Coordinate {
        Coordinate {
            latitude: self.latitude + (other.latitude - self.latitude) * t,
            longitude: self.longitude + (other.longitude - self.longitude) * t,
        }
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(c: Coordinate) -> Self {
        Point::new(c.longitude, c.latitude)
    }
}

impl From<Point<f64>> for Coordinate {
    fn from(p: Point<f64>) -> Self {
        Coordinate::new(p.y(), p.x())
    }
}

/// Compass heading in degrees, always within [0, 360).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Heading(f64);

impl Heading {
    pub fn from_degrees(degrees: f64) -> Self {
        Heading(degrees.rem_euclid(360.0))
    }

    // platforms report a negative heading when it is unknown
    pub fn from_raw(degrees: f64) -> Option<Self> {
        if degrees.is_finite() && degrees >= 0.0 {
            Some(Self::from_degrees(degrees))
        } else {
            None
        }
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }

    pub fn radians(&self) -> f64 {
        self.0.to_radians()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPosition {
    pub coordinate: Option<Coordinate>,
    pub heading: Option<Heading>,
}
