use tracing_subscriber::EnvFilter;

/// Install the global subscriber: JSON lines, level from `RUST_LOG`
/// (default `pixelbridge=info`).
pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pixelbridge=info,pixelbridge_client=info,pixelbridge_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing: {e}"))
}
