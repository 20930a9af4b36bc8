use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber for the test binary. Output is off unless
/// `LOOPWORK_LOG` asks for a level, e.g. `LOOPWORK_LOG=trace`.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("LOOPWORK_LOG").unwrap_or_else(|_| EnvFilter::new("off"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
