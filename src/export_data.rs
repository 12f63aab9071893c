use std::io::Write;

use anyhow::Result;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::landmark::Landmark;
use crate::routing::Route;

pub const CREATOR: &str = "carnav";

pub fn route_to_gpx(route: &Route, landmark: &Landmark) -> Gpx {
    let mut segment = TrackSegment::new();
    segment.points = route
        .coordinates
        .iter()
        .map(|c| Waypoint::new(Point::from(*c)))
        .collect();

    let mut track = Track::new();
    track.name = Some(format!("Route to {}", landmark.name));
    track.segments.push(segment);

    let mut destination = Waypoint::new(Point::from(landmark.coordinate));
    destination.name = Some(landmark.name.clone());

    Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.to_string()),
        waypoints: vec![destination],
        tracks: vec![track],
        ..Default::default()
    }
}

pub fn route_to_gpx_file<W: Write>(
    route: &Route,
    landmark: &Landmark,
    writer: &mut W,
) -> Result<()> {
    let gpx = route_to_gpx(route, landmark);
    gpx::write(&gpx, writer)?;
    Ok(())
}
