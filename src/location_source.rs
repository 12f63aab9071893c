use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;

use crate::coordinate::Coordinate;
use crate::runtime::AppEvent;

/// A raw fix as delivered by the platform location service.
#[derive(Clone, Debug, PartialEq)]
pub struct RawData {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: Option<i64>,
    pub accuracy: Option<f32>,
    pub altitude: Option<f32>,
    pub speed: Option<f32>,
}

impl RawData {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms: None,
            accuracy: None,
            altitude: None,
            speed: None,
        }
    }

    /// `None` when the fix carries no usable coordinate. This is the only
    /// validation applied to location data.
    pub fn coordinate(&self) -> Option<Coordinate> {
        let coordinate = Coordinate::new(self.latitude, self.longitude);
        if coordinate.is_valid() {
            Some(coordinate)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LocationFailure {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location signal lost")]
    SignalLost,
    #[error("location service error: {0}")]
    Other(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum LocationEvent {
    Position(RawData),
    /// Raw compass heading in degrees; negative means unknown.
    Heading(f64),
    Failed(LocationFailure),
}

/// The sending half of the app's update queue, as seen by a location source.
/// Holding one does not keep the app running.
#[derive(Clone)]
pub struct LocationSink {
    tx: WeakUnboundedSender<AppEvent>,
}

impl LocationSink {
    pub(crate) fn new(tx: WeakUnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }

    /// Returns `false` once the app has shut down.
    pub fn send(&self, event: LocationEvent) -> bool {
        match self.tx.upgrade() {
            Some(tx) => tx.send(AppEvent::Location(event)).is_ok(),
            None => false,
        }
    }
}

pub trait LocationSource: Send {
    /// Begin continuous delivery of location events into `sink`. Failures are
    /// delivered as `LocationEvent::Failed` and never end the subscription.
    fn start(&mut self, sink: LocationSink) -> Result<()>;

    /// Trigger exactly one immediate position refresh.
    fn request_once(&mut self);

    fn stop(&mut self);
}

type RequestOnceHook = Box<dyn Fn() + Send + Sync>;

/// Location source driven by the host platform: the host pushes updates
/// through the api and provides a hook for one-shot requests.
pub struct HostLocationSource {
    request_once_hook: Option<RequestOnceHook>,
    started: bool,
}

impl HostLocationSource {
    pub fn new() -> Self {
        Self {
            request_once_hook: None,
            started: false,
        }
    }

    pub fn with_request_once_hook(hook: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            request_once_hook: Some(Box::new(hook)),
            started: false,
        }
    }
}

impl LocationSource for HostLocationSource {
    fn start(&mut self, _sink: LocationSink) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn request_once(&mut self) {
        if !self.started {
            warn!("`request_once` called before the location source is started");
            return;
        }
        match &self.request_once_hook {
            Some(hook) => hook(),
            None => debug!("no one-shot location hook registered"),
        }
    }

    fn stop(&mut self) {
        self.started = false;
    }
}

/// Replays a recorded track at a fixed pace. A heading is derived from each
/// pair of consecutive fixes, the way a compass would report it while moving.
pub struct ReplayLocationSource {
    track: Arc<Vec<RawData>>,
    interval: Duration,
    latest: Arc<Mutex<Option<RawData>>>,
    sink: Option<LocationSink>,
    task: Option<JoinHandle<()>>,
}

impl ReplayLocationSource {
    pub fn new(track: Vec<RawData>, interval: Duration) -> Self {
        Self {
            track: Arc::new(track),
            interval,
            latest: Arc::new(Mutex::new(None)),
            sink: None,
            task: None,
        }
    }

    pub fn latest(&self) -> Option<RawData> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LocationSource for ReplayLocationSource {
    fn start(&mut self, sink: LocationSink) -> Result<()> {
        if self.task.is_some() {
            bail!("replay already started");
        }
        let runtime = tokio::runtime::Handle::try_current()
            .context("replaying a track needs a running tokio runtime")?;

        let track = self.track.clone();
        let latest = self.latest.clone();
        let interval = self.interval;
        let task_sink = sink.clone();
        self.task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut previous: Option<Coordinate> = None;
            for raw_data in track.iter() {
                ticker.tick().await;
                {
                    let mut latest = latest.lock().unwrap_or_else(PoisonError::into_inner);
                    *latest = Some(raw_data.clone());
                }
                if !task_sink.send(LocationEvent::Position(raw_data.clone())) {
                    return;
                }
                if let Some(current) = raw_data.coordinate() {
                    if let Some(previous) = previous.filter(|p| *p != current) {
                        let heading = previous.bearing_to(&current);
                        task_sink.send(LocationEvent::Heading(heading.degrees()));
                    }
                    previous = Some(current);
                }
            }
            info!("replay finished after {} fixes", track.len());
        }));
        self.sink = Some(sink);
        Ok(())
    }

    fn request_once(&mut self) {
        let (Some(sink), Some(latest)) = (&self.sink, self.latest()) else {
            debug!("nothing to re-emit for a one-shot request");
            return;
        };
        sink.send(LocationEvent::Position(latest));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.sink = None;
    }
}

impl Drop for ReplayLocationSource {
    fn drop(&mut self) {
        self.stop();
    }
}
