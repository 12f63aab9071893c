use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::landmark::Landmark;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            name: "Landmark".to_string(),
            latitude: 23.071653,
            longitude: 72.516995,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarAnimationConfig {
    pub tick_ms: u64,
    pub speed_mps: f64,
}

impl Default for CarAnimationConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            speed_mps: 15.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub landmark: LandmarkConfig,
    pub proximity_threshold_meters: f64,
    pub center_span_meters: f64,
    pub auto_center_on_start: bool,
    pub shows_user_location: bool,
    /// Drop route results that resolve after a newer one was already applied.
    pub discard_stale_routes: bool,
    pub car_animation: CarAnimationConfig,
    pub osrm: OsrmConfig,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            landmark: LandmarkConfig::default(),
            proximity_threshold_meters: 100.0,
            center_span_meters: 100.0,
            auto_center_on_start: true,
            shows_user_location: false,
            discard_stale_routes: true,
            car_animation: CarAnimationConfig::default(),
            osrm: OsrmConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn landmark(&self) -> Landmark {
        Landmark {
            name: self.landmark.name.clone(),
            coordinate: Coordinate::new(self.landmark.latitude, self.landmark.longitude),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.landmark().coordinate.is_valid() {
            bail!(
                "invalid landmark coordinate: {}, {}",
                self.landmark.latitude,
                self.landmark.longitude
            );
        }
        if !(self.proximity_threshold_meters > 0.0) {
            bail!(
                "proximity threshold must be positive, got {}",
                self.proximity_threshold_meters
            );
        }
        if !(self.center_span_meters > 0.0) {
            bail!(
                "center span must be positive, got {}",
                self.center_span_meters
            );
        }
        if self.car_animation.tick_ms == 0 || !(self.car_animation.speed_mps > 0.0) {
            bail!("invalid car animation settings: {:?}", self.car_animation);
        }
        Ok(())
    }
}
