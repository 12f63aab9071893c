//! The single update queue. One task owns the controller and the map surface
//! and applies every event in order, so no two mutations ever overlap.
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::controller::{AppController, RouteRequest, ViewState};
use crate::location_source::{LocationEvent, LocationSink, LocationSource};
use crate::map::MapSurface;
use crate::routing::{Route, RouteFailure, RouteProvider};

pub enum AppEvent {
    Location(LocationEvent),
    RouteResolved {
        generation: u64,
        result: Result<Route, RouteFailure>,
    },
    ToggleAutoCenter,
    DismissProximityAlert,
    RequestLocationOnce,
    AnimationTick(Duration),
    /// Answered once every event queued before it has been applied.
    Snapshot(oneshot::Sender<ViewState>),
    ActiveRoute(oneshot::Sender<Option<Route>>),
    Shutdown,
}

pub struct AppRuntime {
    controller: AppController,
    map: Box<dyn MapSurface>,
    route_provider: Arc<dyn RouteProvider>,
    location_source: Option<Box<dyn LocationSource>>,
    animation_tick: Duration,
}

impl AppRuntime {
    pub fn new(
        config: &Config,
        map: impl MapSurface + 'static,
        route_provider: Arc<dyn RouteProvider>,
    ) -> Self {
        Self {
            controller: AppController::new(config),
            map: Box::new(map),
            route_provider,
            location_source: None,
            animation_tick: Duration::from_millis(config.car_animation.tick_ms),
        }
    }

    pub fn with_location_source(mut self, source: impl LocationSource + 'static) -> Self {
        self.location_source = Some(Box::new(source));
        self
    }

    /// Starts the event loop on the current tokio runtime. The loop stops on
    /// `shutdown` or once every `AppHandle` is dropped.
    pub fn spawn(self) -> Result<AppHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("the app runtime must be spawned from within tokio")?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (view_state_tx, view_state) = watch::channel(self.controller.view_state());
        let event_loop = EventLoop {
            controller: self.controller,
            map: self.map,
            route_provider: self.route_provider,
            location_source: self.location_source,
            animation_tick: self.animation_tick,
            tx: tx.downgrade(),
            rx,
            view_state: view_state_tx,
        };
        let task = runtime.spawn(event_loop.run());
        Ok(AppHandle {
            tx,
            view_state,
            task,
        })
    }
}

// Only holds a weak sender, so the queue closes when the last handle goes.
struct EventLoop {
    controller: AppController,
    map: Box<dyn MapSurface>,
    route_provider: Arc<dyn RouteProvider>,
    location_source: Option<Box<dyn LocationSource>>,
    animation_tick: Duration,
    tx: WeakUnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
    view_state: watch::Sender<ViewState>,
}

impl EventLoop {
    async fn run(mut self) {
        self.controller.attach(&mut *self.map);
        if let Some(source) = self.location_source.as_mut() {
            if let Err(e) = source.start(LocationSink::new(self.tx.clone())) {
                error!("failed to start location source: {:?}", e);
            }
        }
        info!("app runtime started");

        let mut ticker = tokio::time::interval(self.animation_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let animating = self.controller.is_car_animation_active();
            tokio::select! {
                event = self.rx.recv() => {
                    let Some(event) = event else { break };
                    if self.dispatch(event).is_break() {
                        break;
                    }
                }
                _ = ticker.tick(), if animating => {
                    self.controller.on_animation_tick(self.animation_tick, &mut *self.map);
                }
            }
            self.publish_view_state();
        }

        if let Some(source) = self.location_source.as_mut() {
            source.stop();
        }
        info!("app runtime stopped");
    }

    fn dispatch(&mut self, event: AppEvent) -> ControlFlow<()> {
        match event {
            AppEvent::Location(LocationEvent::Position(raw_data)) => {
                if let Some(request) = self
                    .controller
                    .on_location_update(&raw_data, &mut *self.map)
                {
                    self.spawn_route_request(request);
                }
            }
            AppEvent::Location(LocationEvent::Heading(degrees)) => {
                self.controller.on_heading_update(degrees, &mut *self.map);
            }
            AppEvent::Location(LocationEvent::Failed(failure)) => {
                self.controller.on_location_failure(&failure);
            }
            AppEvent::RouteResolved { generation, result } => {
                self.controller
                    .on_route_resolved(generation, result, &mut *self.map);
            }
            AppEvent::ToggleAutoCenter => {
                self.controller.on_toggle_auto_center();
            }
            AppEvent::DismissProximityAlert => {
                self.controller.dismiss_proximity_alert();
            }
            AppEvent::RequestLocationOnce => match self.location_source.as_mut() {
                Some(source) => source.request_once(),
                None => debug!("no location source to request a fix from"),
            },
            AppEvent::AnimationTick(elapsed) => {
                self.controller.on_animation_tick(elapsed, &mut *self.map);
            }
            AppEvent::Snapshot(reply) => {
                let _ = reply.send(self.controller.view_state());
            }
            AppEvent::ActiveRoute(reply) => {
                let _ = reply.send(self.controller.active_route().cloned());
            }
            AppEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    // fire and forget: nothing cancels a request once it is issued
    fn spawn_route_request(&self, request: RouteRequest) {
        debug!(
            "route #{} requested ({})",
            request.generation, request.mode
        );
        let future = self
            .route_provider
            .compute_route(request.from, request.to, request.mode);
        // the queue is gone once every handle is dropped
        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let result = future.await;
            let _ = tx.send(AppEvent::RouteResolved {
                generation: request.generation,
                result,
            });
        });
    }

    fn publish_view_state(&self) {
        let latest = self.controller.view_state();
        self.view_state.send_if_modified(|current| {
            if *current != latest {
                *current = latest;
                true
            } else {
                false
            }
        });
    }
}

pub struct AppHandle {
    tx: UnboundedSender<AppEvent>,
    view_state: watch::Receiver<ViewState>,
    task: JoinHandle<()>,
}

impl AppHandle {
    fn send(&self, event: AppEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| anyhow!("app runtime has stopped"))
    }

    /// For hosts that deliver platform location callbacks themselves. A sink
    /// does not keep the app running on its own.
    pub fn location_sink(&self) -> LocationSink {
        LocationSink::new(self.tx.downgrade())
    }

    pub fn send_location(&self, event: LocationEvent) -> Result<()> {
        self.send(AppEvent::Location(event))
    }

    pub fn toggle_auto_center(&self) -> Result<()> {
        self.send(AppEvent::ToggleAutoCenter)
    }

    pub fn dismiss_proximity_alert(&self) -> Result<()> {
        self.send(AppEvent::DismissProximityAlert)
    }

    pub fn request_location_once(&self) -> Result<()> {
        self.send(AppEvent::RequestLocationOnce)
    }

    pub fn advance_animation(&self, elapsed: Duration) -> Result<()> {
        self.send(AppEvent::AnimationTick(elapsed))
    }

    /// The latest published view state, without waiting for queued events.
    pub fn view_state(&self) -> ViewState {
        self.view_state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view_state.clone()
    }

    /// The view state after every event queued so far has been applied.
    pub async fn snapshot(&self) -> Result<ViewState> {
        let (reply, rx) = oneshot::channel();
        self.send(AppEvent::Snapshot(reply))?;
        Ok(rx.await?)
    }

    pub async fn active_route(&self) -> Result<Option<Route>> {
        let (reply, rx) = oneshot::channel();
        self.send(AppEvent::ActiveRoute(reply))?;
        Ok(rx.await?)
    }

    pub async fn shutdown(self) -> Result<()> {
        // already stopped is fine
        let _ = self.send(AppEvent::Shutdown);
        self.task.await?;
        Ok(())
    }
}
