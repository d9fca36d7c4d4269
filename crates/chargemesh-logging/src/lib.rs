//! Structured logging for ChargeMesh nodes
//!
//! Console output is JSONL by default; [`LogConfig::development`] switches to
//! a human-readable format. File output is always JSONL and can rotate daily
//! or hourly through `tracing-appender`.
//!
//! # Quick Start
//!
//! ```ignore
//! use chargemesh_logging::{ChargeMeshSubscriberBuilder, LogConfig};
//!
//! let _guard = ChargeMeshSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init()?;
//! ```
//!
//! # Node Context
//!
//! In the simulator many nodes share one process. Wrap each node's work in a
//! [`NodeContextGuard`] so its spans carry the node's address:
//!
//! ```ignore
//! let _ctx = NodeContextGuard::new(&address);
//! tracing::info!("Dissemination loop started");
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{NodeContextData, NodeContextGuard};
pub use layers::{NodeContextExtension, NodeContextLayer};

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to prepare log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Builder for configuring and installing the ChargeMesh subscriber
pub struct ChargeMeshSubscriberBuilder {
    config: LogConfig,
}

impl ChargeMeshSubscriberBuilder {
    /// Default configuration: JSONL to the console
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally.
    ///
    /// The returned guard flushes the file writer when dropped and must be
    /// kept alive for as long as logging is needed.
    pub fn init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> =
            vec![NodeContextLayer::new().boxed()];

        if self.config.console.enabled {
            let console = if self.config.console.pretty {
                layers::pretty_layer(self.config.console.ansi)
            } else {
                layers::jsonl_layer(std::io::stdout, &self.config.jsonl)
            };
            layers.push(console);
        }

        let mut guard = None;
        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            layers.push(layers::jsonl_layer(writer, &self.config.jsonl));
            guard = Some(file_guard);
        }

        Registry::default()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

        Ok(guard)
    }
}

impl Default for ChargeMeshSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            return Ok(tracing_appender::non_blocking(File::create(path)?));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::new(rotation, &config.directory, &config.prefix);
    Ok(tracing_appender::non_blocking(appender))
}

/// Install the development preset, ignoring an existing subscriber
pub fn init_development() {
    let _ = ChargeMeshSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init();
}

/// Install the testing preset, ignoring an existing subscriber
pub fn init_testing() {
    let _ = ChargeMeshSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .init();
}
