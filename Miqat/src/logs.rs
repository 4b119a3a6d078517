//! Installation du subscriber tracing à partir de la configuration

use miqconfig::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installe le subscriber global
///
/// Le niveau vient de `host.logger.min_level`; `RUST_LOG` le remplace
/// quand il est défini. Les logs vont sur stderr pour laisser stdout aux
/// résultats des commandes.
pub fn init_logging(config: &Config) {
    let level = config
        .get_log_min_level()
        .unwrap_or_else(|_| "INFO".to_string())
        .to_lowercase();
    let console = config.get_log_enable_console().unwrap_or(true);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let fmt_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
