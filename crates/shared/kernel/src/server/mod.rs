//! Shared Axum plumbing: application state, the error type every handler returns, the
//! system routes and common query parameters.

mod error;
mod health;
pub mod params;
pub mod router;
mod state;

pub use error::{ApiError, ApiErrorExt, ErrorResponse};
pub use state::{ApiState, ApiStateBuilder, ApiStateError, ApiStateErrorExt};
