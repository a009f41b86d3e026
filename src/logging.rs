use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the stderr subscriber for the front-end binary.
///
/// `level` overrides `RUST_LOG`; with neither set the default is `info`.
/// Library code only emits events and never calls this.
pub fn init(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry().with(filter).with(stderr_layer).try_init();
}
