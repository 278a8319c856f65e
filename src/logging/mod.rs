/*!
 * Logging Module
 * Subscriber setup and request logging
 */
pub mod config;
pub mod middleware;

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use config::LogSettings;

/// Background writer guards. Dropping them flushes and stops the writers, so
/// keep the value alive until the process exits.
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// Initialize the logging system
pub fn init(settings: &LogSettings) -> LogGuards {
    if let Err(e) = std::fs::create_dir_all(&settings.dir) {
        eprintln!("cannot create log directory {}: {e}", settings.dir);
    }

    // File appender for all logs
    let file_appender = rolling::daily(&settings.dir, "app.log");
    let (file_writer, file_guard) = non_blocking(file_appender);

    // Console writer
    let (console_writer, console_guard) = non_blocking(io::stdout());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.default_filter()));

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let mut guards = vec![file_guard, console_guard];

    if settings.production {
        // File appender for errors only
        let error_appender = rolling::daily(&settings.dir, "error.log");
        let (error_writer, error_guard) = non_blocking(error_appender);
        guards.push(error_guard);

        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        let error_layer = fmt::layer()
            .json()
            .with_writer(error_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(false);

        subscriber
            .with(file_layer)
            .with(error_layer)
            .with(console_layer)
            .init();
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        subscriber.with(file_layer).with(console_layer).init();
    }

    tracing::info!(
        production = settings.production,
        dir = %settings.dir,
        "logging initialized"
    );

    LogGuards { _guards: guards }
}
