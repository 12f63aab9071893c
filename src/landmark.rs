use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub name: String,
    pub coordinate: Coordinate,
}

impl Landmark {
    pub fn distance_from(&self, other: &Coordinate) -> f64 {
        self.coordinate.distance_to(other)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProximityOutcome {
    /// The alert went from hidden to shown on this update.
    Triggered,
    /// Within range, but the alert is still waiting to be dismissed.
    AlreadyShown,
    OutOfRange,
}

/// One-shot proximity alert. Once shown, the alert stays up until
/// `dismiss` is called, no matter where the user goes afterwards.
pub struct ProximityMonitor {
    landmark: Landmark,
    threshold_meters: f64,
    alert_shown: bool,
}

impl ProximityMonitor {
    pub fn new(landmark: Landmark, threshold_meters: f64) -> Self {
        Self {
            landmark,
            threshold_meters,
            alert_shown: false,
        }
    }

    pub fn landmark(&self) -> &Landmark {
        &self.landmark
    }

    pub fn threshold_meters(&self) -> f64 {
        self.threshold_meters
    }

    pub fn is_alert_shown(&self) -> bool {
        self.alert_shown
    }

    pub fn observe(&mut self, position: &Coordinate) -> ProximityOutcome {
        let distance = self.landmark.distance_from(position);
        if distance >= self.threshold_meters {
            ProximityOutcome::OutOfRange
        } else if self.alert_shown {
            ProximityOutcome::AlreadyShown
        } else {
            self.alert_shown = true;
            info!(
                "within {:.1}m of {} (threshold {}m)",
                distance, self.landmark.name, self.threshold_meters
            );
            ProximityOutcome::Triggered
        }
    }

    pub fn dismiss(&mut self) {
        self.alert_shown = false;
    }

    pub fn alert_message(&self) -> Option<String> {
        if self.alert_shown {
            Some(format!(
                "You are within {} meters of {}.",
                self.threshold_meters, self.landmark.name
            ))
        } else {
            None
        }
    }
}
