//! Módulo de base de datos
//!
//! Conexión y migraciones para PostgreSQL.

pub mod connection;

pub use connection::connect;
