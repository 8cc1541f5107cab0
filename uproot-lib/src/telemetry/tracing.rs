use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber from the configured logging
/// section. `RUST_LOG` overrides `logging.level` when set.
pub fn init_tracing(cfg: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(cfg.show_target)
        .init();
}
