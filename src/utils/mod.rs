//! Utilidades compartidas
//!
//! Manejo de errores, helpers de validación y verificación JWT.

pub mod errors;
pub mod jwt;
pub mod validation;
