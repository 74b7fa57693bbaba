use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

pub const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
pub const VALID_FORMATS: [&str; 3] = ["compact", "pretty", "json"];

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (compact, pretty, json)
    pub format: String,
    /// Include thread names
    pub include_thread_names: bool,
    /// Include file and line numbers
    pub include_line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            include_thread_names: false,
            include_line_numbers: false,
        }
    }
}

impl LoggingConfig {
    /// Development logging configuration
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: "pretty".to_string(),
            include_thread_names: true,
            include_line_numbers: true,
        }
    }

    /// Production logging configuration
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
            include_thread_names: false,
            include_line_numbers: false,
        }
    }
}

/// Build the env filter; `RUST_LOG` wins over the configured level
pub fn create_env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).context(format!("Invalid log filter: {}", level)),
    }
}

/// Initialize structured logging based on configuration.
///
/// Logs go to stderr so stdout stays free for device notifications.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = create_env_filter(&config.level)?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(config.include_thread_names)
        .with_line_number(config.include_line_numbers)
        .with_file(config.include_line_numbers);

    let result = match config.format.as_str() {
        "json" => tracing::subscriber::set_global_default(builder.json().finish()),
        "pretty" => tracing::subscriber::set_global_default(builder.pretty().finish()),
        _ => tracing::subscriber::set_global_default(builder.compact().finish()),
    };
    result.context("Failed to set global tracing subscriber")?;

    tracing::info!("Structured logging initialized with level: {}", config.level);
    Ok(())
}

/// Set up panic hook to log panics
pub fn setup_panic_hook() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let panic_msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "Unknown panic payload"
        };

        let location = if let Some(location) = panic_info.location() {
            format!("{}:{}:{}", location.file(), location.line(), location.column())
        } else {
            "Unknown location".to_string()
        };

        tracing::error!(
            panic.msg = panic_msg,
            panic.location = location,
            "Application panicked"
        );

        original_hook(panic_info);
    }));
}

/// Structured event for a registry transition
pub fn log_device_event(transition: &str, device_key: &str, label: &str) {
    tracing::info!(
        transition = transition,
        device_key = device_key,
        label = label,
        event_type = "device",
        "Device transition"
    );
}
