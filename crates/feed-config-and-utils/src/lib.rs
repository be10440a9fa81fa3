//! Configuration, paths and logging setup for the livefeed widget.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    EndpointConfig, FeedConfig, TransportKind, UploadLimits, DEFAULT_BASE_URL, DEFAULT_LOG_LEVEL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service};
pub use paths::Paths;
