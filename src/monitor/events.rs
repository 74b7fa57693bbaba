use std::fmt;
use tokio::sync::mpsc;
use tracing::{info, trace};

use crate::device::Transition;

/// Notifications delivered to whoever consumes the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A new device was registered
    Connected { label: String, composite_key: String },
    /// A registered device went away
    Disconnected { label: String, composite_key: String },
    /// Human-readable status line
    Log(String),
    /// The monitoring session is over
    Finished,
}

impl MonitorEvent {
    /// Outbound event for a registry transition, `None` for no-ops
    pub fn from_transition(transition: &Transition) -> Option<Self> {
        match transition {
            Transition::Added { key, label } => Some(MonitorEvent::Connected {
                label: label.clone(),
                composite_key: key.composite(label),
            }),
            Transition::Removed { key, label } => Some(MonitorEvent::Disconnected {
                label: label.clone(),
                composite_key: key.composite(label),
            }),
            Transition::NoOp => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, MonitorEvent::Finished)
    }
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorEvent::Connected { label, .. } => write!(f, "Connected: {}", label),
            MonitorEvent::Disconnected { label, .. } => write!(f, "Disconnected: {}", label),
            MonitorEvent::Log(message) => f.write_str(message),
            MonitorEvent::Finished => f.write_str("Finished"),
        }
    }
}

/// Fire-and-forget sender for monitor events
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<MonitorEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<MonitorEvent>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: MonitorEvent) {
        if self.tx.send(event).is_err() {
            trace!("monitor event receiver dropped");
        }
    }

    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.emit(MonitorEvent::Log(message));
    }
}
