use crate::config::Config;
use anyhow::Context;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// The terminal preview owns stdout/stderr while it runs, so in preview mode
/// logs only go to `--log-file`; without one they are dropped.
pub fn init(cfg: &Config) -> anyhow::Result<()> {
    let filter = match cfg.log_filter.as_deref() {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid --log-filter '{directive}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if let Some(path) = cfg.log_file.as_deref() {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))?;
    } else if cfg.headless {
        builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))?;
    } else {
        builder
            .with_writer(std::io::sink)
            .try_init()
            .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))?;
    }
    Ok(())
}
