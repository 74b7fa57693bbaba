use std::io;
use thiserror::Error;

/// Failures of the kernel event channel
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to create uevent netlink socket: {0}")]
    Create(#[source] io::Error),
    #[error("Failed to bind uevent netlink socket: {0}")]
    Bind(#[source] io::Error),
    #[error("Failed to read from uevent netlink socket: {0}")]
    Read(#[source] io::Error),
    #[error("Channel is not open")]
    NotOpen,
}

/// Configuration validation failures
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Read timeout must be greater than zero")]
    ZeroReadTimeout,
    #[error("Enrichment command timeout must be greater than zero")]
    ZeroCommandTimeout,
    #[error("Empty program name for {0}")]
    EmptyProgram(&'static str),
    #[error("Unknown multicast group: {0}")]
    UnknownGroup(String),
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),
}
