//! tracing subscriber setup
//!
//! Text mode writes to stdout and the rolling file. JSON mode writes the
//! same structured events to both, so container log collectors and the
//! file agree.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;

/// Directives for the configured level. sqlx logs every statement at info,
/// so it is capped at warn.
fn default_directives(level: &str) -> String {
    format!("{level},sqlx=warn")
}

/// `RUST_LOG` wins over the configured level.
fn build_filter(config: &AppConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)))
}

fn rolling_appender(config: &AppConfig) -> RollingFileAppender {
    use tracing_appender::rolling;
    match config.rotation.as_str() {
        "hourly" => rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => rolling::daily(&config.log_dir, &config.log_file),
        _ => rolling::never(&config.log_dir, &config.log_file),
    }
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process, or buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let (file_writer, guard) = tracing_appender::non_blocking(rolling_appender(config));
    let registry = tracing_subscriber::registry().with(build_filter(config));

    if config.use_json {
        registry
            .with(fmt::layer().json().with_writer(file_writer).with_ansi(false))
            .with(fmt::layer().json().with_ansi(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(file_writer)
                    .with_ansi(false),
            )
            .with(fmt::layer().with_target(false))
            .init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_quiet_sqlx() {
        assert_eq!(
            default_directives("debug"),
            "debug,sqlx=warn"
        );
    }

    #[test]
    fn test_directives_parse() {
        assert!(EnvFilter::try_new(default_directives("info")).is_ok());
    }
}
