use std::fs::File;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use anyhow::Result;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::controller::ViewState;
use crate::location_source::{HostLocationSource, LocationEvent, LocationFailure, RawData};
use crate::map::{MapSnapshot, MapState};
use crate::routing::{OsrmRouteProvider, RouteProvider};
use crate::runtime::{AppHandle, AppRuntime};
use crate::{export_data, logs};

type RequestLocationHandler = Box<dyn Fn() + Send + Sync>;

struct MainState {
    cache_dir: String,
    config: Config,
    // keeps the worker threads alive for as long as the app runs
    runtime: Runtime,
    handle: AppHandle,
    map: Arc<Mutex<MapState>>,
}

static MAIN_STATE: OnceLock<MainState> = OnceLock::new();

static REQUEST_LOCATION_HANDLER: OnceLock<Mutex<Option<RequestLocationHandler>>> =
    OnceLock::new();

fn request_location_handler() -> &'static Mutex<Option<RequestLocationHandler>> {
    REQUEST_LOCATION_HANDLER.get_or_init(|| Mutex::new(None))
}

/// Starts the app with the default directions service. `config_json` may be
/// partial, missing fields keep their defaults.
pub fn init(cache_dir: String, config_json: Option<String>) -> Result<()> {
    let config = match config_json {
        Some(json) => Config::from_json_str(&json)?,
        None => Config::default(),
    };
    let route_provider = Arc::new(OsrmRouteProvider::new(&config.osrm)?);
    init_with_route_provider(cache_dir, config, route_provider)
}

pub fn init_with_route_provider(
    cache_dir: String,
    config: Config,
    route_provider: Arc<dyn RouteProvider>,
) -> Result<()> {
    config.validate()?;
    if MAIN_STATE.get().is_some() {
        warn!("`init` is called multiple times");
        return Ok(());
    }

    logs::init(&cache_dir, &config.log_level)?;

    let runtime = Runtime::new()?;
    let map = Arc::new(Mutex::new(MapState::new()));
    let location_source = HostLocationSource::with_request_once_hook(|| {
        let handler = request_location_handler()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match handler.as_ref() {
            Some(handler) => handler(),
            None => warn!("no location request handler registered"),
        }
    });
    let handle = {
        let _guard = runtime.enter();
        AppRuntime::new(&config, map.clone(), route_provider)
            .with_location_source(location_source)
            .spawn()?
    };
    info!(
        "initialized, landmark: {} ({}, {})",
        config.landmark.name, config.landmark.latitude, config.landmark.longitude
    );

    let state = MainState {
        cache_dir,
        config,
        runtime,
        handle,
        map,
    };
    if MAIN_STATE.set(state).is_err() {
        warn!("`init` raced with another `init`");
    }
    Ok(())
}

fn get() -> Result<&'static MainState> {
    MAIN_STATE
        .get()
        .ok_or_else(|| anyhow!("main state is not initialized"))
}

/// Registers the platform call that triggers a single location refresh.
pub fn set_location_request_handler(handler: impl Fn() + Send + Sync + 'static) {
    let mut guard = request_location_handler()
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    *guard = Some(Box::new(handler));
}

pub fn set_log_sink(sink: impl Fn(String) + Send + Sync + 'static) {
    logs::set_host_sink(sink);
}

pub fn on_location_update(mut raw_data_list: Vec<RawData>) -> Result<()> {
    let state = get()?;
    // NOTE: some platforms deliver a batch of fixes out of order.
    raw_data_list.sort_by(|a, b| a.timestamp_ms.cmp(&b.timestamp_ms));
    for raw_data in raw_data_list {
        state.handle.send_location(LocationEvent::Position(raw_data))?;
    }
    Ok(())
}

pub fn on_heading_update(degrees: f64) -> Result<()> {
    get()?
        .handle
        .send_location(LocationEvent::Heading(degrees))
}

pub fn on_location_error(failure: LocationFailure) -> Result<()> {
    get()?.handle.send_location(LocationEvent::Failed(failure))
}

pub fn request_location_once() -> Result<()> {
    get()?.handle.request_location_once()
}

pub fn toggle_auto_center() -> Result<()> {
    get()?.handle.toggle_auto_center()
}

pub fn dismiss_proximity_alert() -> Result<()> {
    get()?.handle.dismiss_proximity_alert()
}

/// Blocks until every update sent so far has been applied. Must not be
/// called from inside the app's own runtime.
pub fn get_view_state() -> Result<ViewState> {
    let state = get()?;
    state.runtime.block_on(state.handle.snapshot())
}

/// The last published view state, never blocks.
pub fn peek_view_state() -> Result<ViewState> {
    Ok(get()?.handle.view_state())
}

pub fn get_map_snapshot_if_changed(
    client_version: Option<String>,
) -> Result<Option<(MapSnapshot, String)>> {
    let map = get()?.map.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(map
        .get_latest_if_changed(client_version.as_deref())
        .map(|(snapshot, version)| (snapshot.clone(), version)))
}

pub fn get_config() -> Result<Config> {
    Ok(get()?.config.clone())
}

pub fn export_logs(target_file_path: String) -> Result<()> {
    logs::export(&get()?.cache_dir, &target_file_path)
}

/// Returns `false` when there is no route to export yet.
pub fn export_active_route(target_filepath: String) -> Result<bool> {
    let state = get()?;
    let Some(route) = state.runtime.block_on(state.handle.active_route())? else {
        return Ok(false);
    };
    let mut file = File::create(target_filepath)?;
    export_data::route_to_gpx_file(&route, &state.config.landmark(), &mut file)?;
    Ok(true)
}

pub mod for_testing {
    use super::*;

    pub fn get_map_state() -> Result<Arc<Mutex<MapState>>> {
        Ok(get()?.map.clone())
    }
}
