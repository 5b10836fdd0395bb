//! Middleware HTTP: autenticación JWT, CORS y rate limiting.

pub mod auth;
pub mod cors;
pub mod rate_limit;

pub use auth::auth_middleware;
pub use cors::{cors_middleware, cors_middleware_with_origins};
pub use rate_limit::{rate_limit_middleware, RateLimitState};
