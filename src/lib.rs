//! Fleet mileage recording and threshold alerting.
//!
//! Drivers and fleet managers submit odometer readings; each accepted reading
//! is appended to an immutable ledger, advances the vehicle's odometer and is
//! evaluated against its service-interval limit, firing at most one alert per
//! threshold crossing.

pub mod config;
pub mod database;
pub mod dto;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_app;
pub use state::AppState;
