//! Logging setup.

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV_VAR: &str = "ISOCATALOG_LOG";

const LOG_FILE_PREFIX: &str = "isocatalog.log";

/// Installs the global subscriber.
///
/// Logs always go to stderr. With `log_dir`, they are also written to a
/// daily-rotated file there; the returned guard must stay alive for the
/// file writer to flush.
pub fn init(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let Some(dir) = log_dir else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
        return None;
    };

    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Failed to create log directory {}: {e}", dir.display());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr.and(file_writer))
        .with_ansi(false)
        .try_init();

    tracing::debug!(dir = %dir.display(), "File logging enabled");
    Some(guard)
}
