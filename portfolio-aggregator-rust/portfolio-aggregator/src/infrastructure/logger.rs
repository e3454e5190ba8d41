use std::sync::{Once, OnceLock};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::infrastructure::config::Config;

static INIT: Once = Once::new();
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    /// Daily-rolling log files are written here when set.
    pub log_directory: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_directory: None,
        }
    }
}

impl From<&Config> for LogConfig {
    fn from(config: &Config) -> Self {
        Self {
            level: config.log_level.clone(),
            log_directory: config.log_dir.clone(),
        }
    }
}

impl LogConfig {
    pub fn level(&self) -> Level {
        match self.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// `RUST_LOG` wins over the configured level.
    pub fn default_directives(&self) -> String {
        format!(
            "portfolio_aggregator={},actix_web=info",
            self.level().to_string().to_lowercase()
        )
    }
}

pub struct Logger;

impl Logger {
    /// Installs the global subscriber. Later calls are no-ops.
    pub fn init(config: &LogConfig) {
        INIT.call_once(|| {
            let env_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

            let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

            let console_layer = fmt::layer()
                .with_timer(UtcTime::rfc_3339())
                .with_target(true)
                .with_writer(std::io::stdout);
            layers.push(Box::new(console_layer));

            if let Some(directory) = &config.log_directory {
                if let Err(e) = std::fs::create_dir_all(directory) {
                    eprintln!("Failed to create log directory {directory}: {e}");
                } else {
                    let file_appender = rolling::daily(directory, "portfolio_aggregator.log");
                    let (writer, guard) = non_blocking(file_appender);
                    let _ = FILE_GUARD.set(guard);
                    let file_layer = fmt::layer()
                        .with_timer(UtcTime::rfc_3339())
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(writer);
                    layers.push(Box::new(file_layer));
                }
            }

            let subscriber = Registry::default().with(layers).with(env_filter);
            if let Err(e) = subscriber.try_init() {
                eprintln!("Logger already initialized: {e}");
            }
        });
    }
}
