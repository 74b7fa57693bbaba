//! Human-readable device labels
//!
//! The monitor asks a [`DeviceLabeler`] for a label whenever a new device
//! shows up. An empty label means "nothing worth reporting" and the add is
//! dropped.

pub mod system;

use async_trait::async_trait;

use crate::device::{ClassifiedEvent, Subsystem};

pub use system::SystemLabeler;

/// Fallback text for USB devices nobody could name
pub const UNKNOWN_DEVICE: &str = "Unknown";

#[async_trait]
pub trait DeviceLabeler: Send + Sync {
    /// Describe a newly added device. Must not fail; return an empty string
    /// when nothing is known.
    async fn describe(&self, event: &ClassifiedEvent) -> String;

    fn name(&self) -> &'static str;
}

/// Labels built only from the uevent fields, no external tools
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordLabeler;

#[async_trait]
impl DeviceLabeler for RecordLabeler {
    async fn describe(&self, event: &ClassifiedEvent) -> String {
        let record = &event.record;
        match event.subsystem {
            Subsystem::Usb => {
                if record.product().is_none() {
                    return String::new();
                }
                let model = record
                    .id_model()
                    .map(str::to_string)
                    .or_else(|| {
                        record
                            .product()
                            .and_then(system::parse_product)
                            .map(|(vid, pid)| format!("{}:{}", vid, pid))
                    })
                    .unwrap_or_else(|| UNKNOWN_DEVICE.to_string());
                format!("Device: {}", model)
            }
            Subsystem::Block => match record.devname().map(devname_basename) {
                Some(name) if !name.is_empty() => format!("Storage: {}", name),
                _ => String::new(),
            },
        }
    }

    fn name(&self) -> &'static str {
        "record"
    }
}

/// `/dev/sdb1` -> `sdb1`
pub fn devname_basename(devname: &str) -> &str {
    devname.rsplit('/').next().unwrap_or(devname)
}
