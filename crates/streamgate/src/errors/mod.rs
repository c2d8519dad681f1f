//! Centralized error handling for streamgate
//!
//! Errors are split by the layer that produces them:
//!
//! - **Gateway Errors**: per-request failures of the manifest gateway, each of
//!   which maps onto exactly one HTTP response
//! - **Transport Errors**: failures talking to the upstream media service
//! - **Application Errors**: configuration and startup failures
//!
//! Playback failures are not errors in this sense; they are engine events
//! classified by the playback controller (see [`crate::playback`]).
//!
//! # Usage
//!
//! ```rust
//! use streamgate::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for gateway Results
pub type GatewayResult<T> = Result<T, GatewayError>;
