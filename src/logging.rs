//! Diagnostic logging setup.
//!
//! Operator-facing output goes through [`crate::ui`]; this is only for the
//! `tracing` events sprinkled through the pipeline.  They go to stderr so they
//! never mix with streamed archiver output on stdout.

use tracing_subscriber::{EnvFilter, fmt};

/// Map the `-v` count to a default filter directive.
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.  `RUST_LOG`, when set, overrides `verbose`.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbose)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(3), "trace");
        assert_eq!(level_for(200), "trace");
    }

    #[test]
    fn init_twice_is_harmless() {
        init(0);
        init(2);
    }
}
