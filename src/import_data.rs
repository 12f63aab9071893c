use std::fs::File;
use std::io::BufReader;

use anyhow::Result;
use chrono::{DateTime, Utc};
use gpx::read;

use crate::location_source::RawData;

/// Loads every track point of a GPX file, in file order, as raw fixes that a
/// `ReplayLocationSource` can play back.
pub fn load_gpx(file_path: &str) -> Result<Vec<RawData>> {
    let gpx_data = read(BufReader::new(File::open(file_path)?))?;
    let mut raw_data_list = Vec::new();
    for track in &gpx_data.tracks {
        for segment in &track.segments {
            for point in &segment.points {
                let timestamp = match &point.time {
                    Some(time) => Some(DateTime::<Utc>::from(DateTime::parse_from_rfc3339(
                        &time.format()?,
                    )?)),
                    None => None,
                };
                raw_data_list.push(RawData {
                    latitude: point.point().y(),
                    longitude: point.point().x(),
                    timestamp_ms: timestamp.map(|x| x.timestamp_millis()),
                    accuracy: point.hdop.map(|hdop| hdop as f32),
                    altitude: point.elevation.map(|value| value as f32),
                    speed: point.speed.map(|value| value as f32),
                });
            }
        }
    }
    info!("loaded {} fixes from {}", raw_data_list.len(), file_path);
    Ok(raw_data_list)
}
