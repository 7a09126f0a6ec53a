// history-academy/src/telemetry.rs

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: store lifecycle at `info`, per-row writes at
/// `debug` from one `-v`, everything at `trace` from two.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,history_academy=info",
        1 => "warn,history_academy=debug",
        _ => "trace",
    }
}

pub fn init_tracing(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
