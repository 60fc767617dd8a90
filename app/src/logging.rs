use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Log to stdout and a daily rolling file in `base_dir`.
///
/// Keep the returned guard alive for as long as the process logs.
pub fn init(log_level: &str, base_dir: &Path, file_name: &str, debug_console: bool) -> Option<WorkerGuard> {
    #[cfg(feature = "tokio-console")]
    if debug_console {
        console_subscriber::init();
        return None;
    }
    #[cfg(not(feature = "tokio-console"))]
    if debug_console {
        eprintln!("debug console requested but built without the tokio-console feature");
    }

    let file_appender = rolling::daily(base_dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .with_writer(std::io::stdout.and(file_writer))
        .init();
    Some(guard)
}
