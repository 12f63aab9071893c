#![allow(clippy::new_without_default)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

pub mod api;
pub mod config;
pub mod controller;
pub mod coordinate;
pub mod export_data;
pub mod import_data;
pub mod landmark;
pub mod location_source;
mod logs;
pub mod map;
pub mod routing;
pub mod runtime;
pub mod utils;
