//! Data models
//!
//! Row types map the PostgreSQL schema in `migrations/`; the same types back
//! the in-memory store.

pub mod activity;
pub mod alert;
pub mod auth;
pub mod maintenance;
pub mod mileage;
pub mod pagination;
pub mod settings;
pub mod vehicle;
