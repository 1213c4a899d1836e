//! Centralized logging setup with dual output (stdout + log file)

use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE: &str = "hotrank.log";

fn env_filter() -> tracing_subscriber::EnvFilter {
    // Level comes from RUST_LOG; defaults to "info" when unset
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize logging with dual output: stdout plus a file in the
/// working directory
///
/// Both outputs honor the same RUST_LOG level. The appender guard is
/// forgotten to keep the file writer alive for the program lifetime.
pub fn init_dual_logging() {
    let file_appender = tracing_appender::rolling::never(".", LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(env_filter()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(env_filter()),
        )
        .init();

    std::mem::forget(guard);
}
