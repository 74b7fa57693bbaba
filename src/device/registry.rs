use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info};

use super::classifier::{Action, ClassifiedEvent};
use super::key::DeviceKey;

/// Outcome of applying one classified event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Added { key: DeviceKey, label: String },
    Removed { key: DeviceKey, label: String },
    NoOp,
}

impl Transition {
    /// `key:label` for Added/Removed
    pub fn composite_key(&self) -> Option<String> {
        match self {
            Transition::Added { key, label } | Transition::Removed { key, label } => {
                Some(key.composite(label))
            }
            Transition::NoOp => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Transition::NoOp)
    }
}

/// Devices currently connected, keyed by parent device path.
///
/// Owned by the monitor task; nothing else mutates it.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: HashMap<DeviceKey, String>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an add/remove to the registry.
    ///
    /// `label_fn` runs only for an add on a key not yet present; an empty
    /// label leaves the registry untouched.
    pub async fn apply<'a, F, Fut>(&mut self, event: &'a ClassifiedEvent, label_fn: F) -> Transition
    where
        F: FnOnce(&'a ClassifiedEvent) -> Fut,
        Fut: Future<Output = String>,
    {
        match &event.action {
            Action::Add => {
                if self.devices.contains_key(&event.key) {
                    debug!(key = %event.key, "device already registered, ignoring add");
                    return Transition::NoOp;
                }

                let label = label_fn(event).await;
                if label.is_empty() {
                    debug!(key = %event.key, subsystem = %event.subsystem, "no label for device, ignoring add");
                    return Transition::NoOp;
                }

                info!(key = %event.key, label = %label, "device connected");
                self.devices.insert(event.key.clone(), label.clone());
                Transition::Added {
                    key: event.key.clone(),
                    label,
                }
            }
            Action::Remove => match self.devices.remove(&event.key) {
                Some(label) => {
                    info!(key = %event.key, label = %label, "device disconnected");
                    Transition::Removed {
                        key: event.key.clone(),
                        label,
                    }
                }
                None => {
                    debug!(key = %event.key, "unknown device removed");
                    Transition::NoOp
                }
            },
            Action::Other(_) => Transition::NoOp,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn contains(&self, key: &DeviceKey) -> bool {
        self.devices.contains_key(key)
    }

    pub fn label(&self, key: &DeviceKey) -> Option<&str> {
        self.devices.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DeviceKey, &str)> {
        self.devices.iter().map(|(k, v)| (k, v.as_str()))
    }
}
