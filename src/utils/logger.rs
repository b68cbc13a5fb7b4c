//! Logging utilities

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

fn build_filter(level: LogLevel, directives: Option<&str>) -> EnvFilter {
    match directives {
        Some(directives) => match LogLevel::from_str(directives) {
            Some(level) => EnvFilter::new(format!("test_scheduler={}", level.to_tracing_level())),
            None => EnvFilter::try_new(directives).unwrap_or_else(|_| {
                EnvFilter::new(format!("test_scheduler={}", level.to_tracing_level()))
            }),
        },
        None => EnvFilter::new(format!("test_scheduler={}", level.to_tracing_level())),
    }
}

/// Initialize the logger.
///
/// `directives` is either a bare level or a full filter such as
/// `test_scheduler=trace,tokio=debug`. It takes precedence over `level`.
/// Logs go to stderr so machine-readable output on stdout stays clean.
pub fn init_logger(level: LogLevel, directives: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level, directives))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
