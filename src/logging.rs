use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber: human-readable output on stdout and,
/// when `log_dir` is set, JSON lines in a daily-rotated file.
pub fn init_logging(log_dir: Option<&str>) {
    let file_layer = log_dir.map(|dir| {
        let file_appender = rolling::daily(dir, "provision.log");
        fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .json()
    });

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}
