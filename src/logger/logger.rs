use crate::settings::Log;
use anyhow::{Result, anyhow};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const BOOTSTRAP_FILTER: &str = "info";

/// Global subscriber whose filter can be swapped once settings are known.
pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
}

impl Logger {
    /// Installs the subscriber. `RUST_LOG` wins over the built-in `info` until
    /// [`Logger::apply`] is called.
    pub fn bootstrap() -> Self {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_FILTER));
        let (filter, reload_handle) = reload::Layer::new(filter);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();

        Self { reload_handle }
    }

    pub fn apply(&self, log: &Log) -> Result<()> {
        let filter = parse_filter(&log.filter)?;
        self.reload_handle.reload(filter).map_err(|e| anyhow!(e))?;
        tracing::debug!(filter = %log.filter, "log filter applied");
        Ok(())
    }
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| anyhow!("invalid log filter {:?}: {}", directives, e))
}
