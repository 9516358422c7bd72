use crate::config::LoggingConfig;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Routes tracing output to a daily log file; the terminal belongs to the UI.
/// Keep the returned guard alive until exit so buffered lines get flushed.
pub fn initialize_logging(settings: &LoggingConfig) -> WorkerGuard {
    let _ = std::fs::create_dir_all(&settings.directory);

    let file_appender = tracing_appender::rolling::daily(&settings.directory, &settings.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let level = base_level(&settings.level);
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!(
        "Logging to {}/{} at {}",
        settings.directory,
        settings.file_name,
        level
    );
    guard
}

// Unknown names fall back to INFO rather than silencing the log.
fn base_level(name: &str) -> Level {
    name.trim().parse().unwrap_or(Level::INFO)
}
