//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a fallback level when `RUST_LOG` is unset
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_level(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .is_test(cfg!(test))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_with_level(log::LevelFilter::Debug);
        init_with_level(log::LevelFilter::Trace);
        info!("logging initialised twice");
        assert!(log::max_level() >= log::LevelFilter::Debug);
    }
}
