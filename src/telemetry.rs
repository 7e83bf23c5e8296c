use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn rust_log() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into())
}

/// install the stderr subscriber, filter from `RUST_LOG` (default `info`)
///
/// safe to call more than once; later calls keep the first subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(rust_log()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
