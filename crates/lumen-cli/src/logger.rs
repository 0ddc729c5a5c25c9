use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE: &str = "lumen.log";

pub enum LogTarget<'a> {
    Stderr,
    /// Daily-rolling file under `dir`; used while the terminal UI owns stdout.
    File(&'a Path),
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_logger(default_level: &str, target: LogTarget<'_>) -> Option<WorkerGuard> {
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match target {
        LogTarget::Stderr => {
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true);
            let _ = tracing_subscriber::registry()
                .with(filter_layer)
                .with(console_layer)
                .try_init();
            None
        }
        LogTarget::File(dir) => {
            if let Err(err) = std::fs::create_dir_all(dir) {
                eprintln!("Failed to create log directory: {err}");
                return None;
            }
            let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::Layer::new()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_level(true);
            let _ = tracing_subscriber::registry()
                .with(filter_layer)
                .with(file_layer)
                .try_init();
            info!(dir = %dir.display(), "file logging initialized");
            Some(guard)
        }
    }
}
