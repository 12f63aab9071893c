pub mod osrm;
pub mod route_provider;

pub use osrm::OsrmRouteProvider;
pub use route_provider::{
    FixedRouteProvider, Route, RouteFailure, RouteFuture, RouteProvider, TransportMode,
};
