//! Core campaign, event and A/B testing types for the hashbar engine.

pub mod assignment;
pub mod auth;
pub mod campaign;
pub mod client_ip;
pub mod device;
pub mod error;
pub mod events;
pub mod limits;
pub mod stats;

pub use auth::*;
pub use campaign::*;
pub use client_ip::*;
pub use device::DeviceDetector;
pub use error::{AuthErrorCode, DbErrorCode, Error, Result, ValidationErrorCode};
pub use events::*;
pub use stats::*;
