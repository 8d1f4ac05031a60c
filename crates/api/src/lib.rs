//! HTTP API layer for the hashbar engine.

pub mod assignment;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use assignment::{AssignmentConfig, VariantAssigner};
pub use middleware::rate_limit::RateLimitConfig;
pub use routes::router;
pub use state::AppState;
