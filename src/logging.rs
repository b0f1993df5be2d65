use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the stderr subscriber; `RUST_LOG` takes precedence over `verbose`
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "region_recon=debug" } else { "region_recon=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries the JSON report
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .init();
}
