#[path = "connector/config.rs"]
mod config;

#[path = "connector/result.rs"]
mod result;

#[path = "connector/wrapper.rs"]
mod wrapper;

pub use config::{BackendConfig, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
pub use result::QueryResult;
pub use wrapper::{Connector, SystemInfo, CANARY_QUESTION};
