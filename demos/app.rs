//! Drives the app with a replayed track and prints what the UI would show.
//!
//!     cargo run --example app -- [track.gpx] [--osrm]
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carnav_core::config::Config;
use carnav_core::import_data;
use carnav_core::location_source::{RawData, ReplayLocationSource};
use carnav_core::map::MapState;
use carnav_core::routing::{FixedRouteProvider, OsrmRouteProvider, RouteProvider};
use carnav_core::runtime::AppRuntime;

// a straight drive from ~1.6km out to the landmark
fn synthetic_track(config: &Config) -> Vec<RawData> {
    let landmark = config.landmark().coordinate;
    let start = (23.0800, 72.5300);
    (0..=40)
        .map(|i| {
            let t = i as f64 / 40.0;
            RawData::new(
                start.0 + (landmark.latitude - start.0) * t,
                start.1 + (landmark.longitude - start.1) * t,
            )
        })
        .collect()
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    let use_osrm = args.iter().any(|a| a == "--osrm");
    let gpx_path = args.iter().find(|a| !a.starts_with("--"));

    let config = Config::default();
    let track = match gpx_path {
        Some(path) => import_data::load_gpx(path)?,
        None => synthetic_track(&config),
    };
    let route_provider: Arc<dyn RouteProvider> = if use_osrm {
        Arc::new(OsrmRouteProvider::new(&config.osrm)?)
    } else {
        Arc::new(FixedRouteProvider::direct())
    };

    let map = Arc::new(Mutex::new(MapState::new()));
    let handle = AppRuntime::new(&config, map.clone(), route_provider)
        .with_location_source(ReplayLocationSource::new(
            track,
            Duration::from_millis(250),
        ))
        .spawn()?;

    let mut view_state = handle.subscribe();
    let deadline = tokio::time::sleep(Duration::from_secs(15));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            changed = view_state.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = view_state.borrow_and_update().clone();
                println!(
                    "[{}] route: {}, car moving: {}, position: {:?}",
                    state.toggle_label,
                    state.has_route,
                    state.car_animation_active,
                    state.user_position.coordinate,
                );
                if let Some(message) = state.proximity_alert {
                    println!("ALERT: {message}");
                    handle.dismiss_proximity_alert()?;
                    break;
                }
            }
            _ = &mut deadline => break,
        }
    }

    handle.shutdown().await?;
    Ok(())
}
