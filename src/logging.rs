use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `gogodo=debug`
pub const LOG_ENV: &str = "GOGODO_LOG";
const DEFAULT_FILTER: &str = "gogodo=info";

/// Send `tracing` output to `gogodo.log` in `log_dir`. The terminal is left
/// alone so the TUI's screen is never overwritten.
///
/// Keep the returned guard alive until exit; dropping it flushes the log.
pub fn init(log_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Logging disabled: cannot create {}: {}", log_dir.display(), e);
        return None;
    }

    let appender = tracing_appender::rolling::never(log_dir, "gogodo.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .try_init();

    match installed {
        Ok(()) => Some(guard),
        // Already installed (tests, repeated init)
        Err(_) => None,
    }
}
