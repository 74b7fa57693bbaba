use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ChannelError, ConfigError};

/// One datagram as received from the kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    payload: Bytes,
}

impl RawEvent {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Lifecycle state of an event channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Closed,
    Open,
}

/// Netlink multicast group the channel subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MulticastGroup {
    /// Raw kernel broadcast
    #[default]
    Kernel,
    /// Broadcast re-emitted by udevd after rule processing
    Udev,
}

impl MulticastGroup {
    /// Group bitmask passed to bind
    pub fn mask(&self) -> u32 {
        match self {
            MulticastGroup::Kernel => 1,
            MulticastGroup::Udev => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MulticastGroup::Kernel => "kernel",
            MulticastGroup::Udev => "udev",
        }
    }
}

impl fmt::Display for MulticastGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MulticastGroup {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kernel" => Ok(MulticastGroup::Kernel),
            "udev" => Ok(MulticastGroup::Udev),
            other => Err(ConfigError::UnknownGroup(other.to_string())),
        }
    }
}

/// Source of raw uevent datagrams
#[async_trait]
pub trait EventChannel: Send {
    /// Create and bind the underlying socket
    async fn open(&mut self) -> Result<(), ChannelError>;

    /// Wait up to `timeout` for one datagram; `Ok(None)` when nothing arrived
    async fn read_timeout(&mut self, timeout: Duration) -> Result<Option<RawEvent>, ChannelError>;

    /// Release the socket. Safe to call any number of times.
    fn close(&mut self);

    fn state(&self) -> ChannelState;

    fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }
}
