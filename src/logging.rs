use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Initialize logging: a compact console layer plus a plain-text layer
/// appending to `<log_dir>/service.log`. A second call is a no-op.
pub fn init(log_dir: &str) -> anyhow::Result<()> {
    fs::create_dir_all(log_dir)?;
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(Path::new(log_dir).join("service.log"))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer().with_target(true).compact();
    let file_layer = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    Ok(())
}
