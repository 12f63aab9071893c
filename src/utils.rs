use std::f64::consts::PI;

// meters per degree of latitude, also of longitude at the equator
pub const METERS_PER_DEGREE: f64 = 111_320.0;

// longitude spans blow up near the poles, clamp the scale there
const MIN_LATITUDE_SCALE: f64 = 1e-6;

/// Converts a span in meters around `latitude` into a
/// (latitude delta, longitude delta) pair in degrees.
pub fn meters_to_degree_span(latitude: f64, span_meters: f64) -> (f64, f64) {
    let latitude_delta = span_meters / METERS_PER_DEGREE;
    let scale = (latitude / 180.0 * PI).cos().abs().max(MIN_LATITUDE_SCALE);
    let longitude_delta = (span_meters / (METERS_PER_DEGREE * scale)).min(360.0);
    (latitude_delta, longitude_delta)
}
