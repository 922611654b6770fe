//! Logging setup
//!
//! Console output plus an optional ANSI-free copy in the run's `log.txt`.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*};

use crate::error::{GanError, Result};

/// Parse a level name (trace, debug, info, warn, error, off)
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    level
        .parse::<LevelFilter>()
        .map_err(|_| GanError::config(format!("unknown log level '{level}'")))
}

/// Install the global subscriber
///
/// When `log_file` is given every event is also appended to it. A second
/// call in the same process keeps the first subscriber.
pub fn setup_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = parse_level(level)?;

    let file_layer = match log_file {
        Some(path) => {
            let file = File::options().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .with(filter)
        .try_init()
        .ok();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_level("DEBUG").unwrap(), LevelFilter::DEBUG);
        assert!(parse_level("chatty").is_err());
    }
}
