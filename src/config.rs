//! Run configuration as plain data.
//!
//! Nothing here reads the process environment: callers that want `${VAR}`
//! expansion pass their own lookup to [`interpolate`] or [`RunConfig::load_with`].

#[path = "config/error.rs"]
mod error;

#[path = "config/interpolate.rs"]
mod interpolate;

#[path = "config/types.rs"]
mod types;

pub use error::ConfigError;
pub use interpolate::interpolate;
pub use types::{LoggingConfig, RunConfig};
