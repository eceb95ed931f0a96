use env_logger::{Builder, Env};
use log::LevelFilter;

/// Initialize the global logger.
///
/// Verbosity maps `-v` counts onto log levels; warnings stay visible at the
/// default level. The `TRELLIS_LOG` environment variable overrides the
/// filter entirely.
pub fn init_logger(verbosity: u8) {
    let env = Env::default().filter("TRELLIS_LOG");

    Builder::new()
        .filter_level(u8_to_loglevel(verbosity))
        .parse_env(env)
        .try_init()
        .ok(); // a second init (e.g. in tests) is harmless
}

fn u8_to_loglevel(verbosity: u8) -> LevelFilter {
    match verbosity {
        0           => LevelFilter::Warn,
        1           => LevelFilter::Info,
        2           => LevelFilter::Debug,
        3..=u8::MAX => LevelFilter::Trace,
    }
}

/// Lower the filter to errors only.
pub fn quiet() {
    log::set_max_level(LevelFilter::Error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_mapping() {
        assert_eq!(u8_to_loglevel(0), LevelFilter::Warn);
        assert_eq!(u8_to_loglevel(1), LevelFilter::Info);
        assert_eq!(u8_to_loglevel(2), LevelFilter::Debug);
        assert_eq!(u8_to_loglevel(3), LevelFilter::Trace);
        assert_eq!(u8_to_loglevel(255), LevelFilter::Trace);
    }
}
