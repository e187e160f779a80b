use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, filter::EnvFilter, fmt};

use std::panic::PanicHookInfo;

const ENV_DEBUG: &str = "OUTBOUND_DEBUG";

/// Reports panics as a single `ERROR` event, tagged with the panicking thread. The sender's
/// worker runs on a named thread, so its panics are attributed to the sender name.
fn report_panic(info: &PanicHookInfo<'_>) {
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    let location = info
        .location()
        .map(|l| format!("{}:{}", l.file(), l.line()))
        .unwrap_or_default();
    let thread = std::thread::current();

    tracing::error!(
        thread = thread.name().unwrap_or("<unnamed>"),
        %location,
        "Panicked - {payload}"
    );
}

pub(crate) fn register() {
    // RUST_LOG can be used to set the log level, the default is `info`.
    let debug_mode = std::env::var(ENV_DEBUG).is_ok_and(|v| v.to_lowercase() == "true");
    let default_log_level = if debug_mode { "debug" } else { "info" };

    let filter = EnvFilter::builder()
        .with_default_directive(default_log_level.parse().unwrap_or(Level::INFO.into()))
        .from_env_lossy();

    let layer = if debug_mode {
        // Text format
        fmt::layer().with_thread_names(true).boxed()
    } else {
        // JSON format, flattened
        fmt::layer()
            .with_ansi(false)
            .with_thread_names(true)
            .json()
            .flatten_event(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .init();

    std::panic::set_hook(Box::new(report_panic));
}
