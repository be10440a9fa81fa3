//! Logging initialization for the widget binaries.
//!
//! Thin wrappers over the observability crate so callers only pass a level.

/// Initialize logging for the `livefeed` service.
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("widget started");
/// ```
pub fn init_logging(level: &str) {
    init_logging_for_service("livefeed", level);
}

/// Initialize logging with a custom service name.
pub fn init_logging_for_service(service_name: &str, level: &str) {
    observability::init_with_config(observability::LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        also_stderr: true,
        ..Default::default()
    });
}
