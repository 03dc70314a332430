//! Logger initialisation.

use crate::config::LogLevel;

/// Install the global `env_logger` at `level`.
///
/// A `RUST_LOG` filter in the environment takes precedence over `level`.
/// Returns false if a logger was already installed.
pub fn init(level: LogLevel) -> bool {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.to_level_filter());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    match builder.try_init() {
        Ok(()) => {
            log::debug!("Logger initialised at {}", level.name());
            true
        }
        Err(_) => false,
    }
}
