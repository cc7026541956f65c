use crate::config::LogLevel;

/// Installs the JSON subscriber for this Lambda container. Call once from
/// `main`, before the runtime starts polling for events.
pub fn init(level: LogLevel) {
    tracing_subscriber::fmt()
        .json()
        .with_max_level(level.as_tracing_level())
        .with_target(false)
        .without_time()
        .init();
}
