//! Process-local telemetry for the hashbar engine: health, metrics and
//! structured logging.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
