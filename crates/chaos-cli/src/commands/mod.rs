pub mod agent;
pub mod config;
pub mod controller;
pub mod experiments;
pub mod start;
pub mod stop;

/// Join a controller base URL and a route.
pub(crate) fn endpoint(base: &str, route: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), route.trim_start_matches('/'))
}
