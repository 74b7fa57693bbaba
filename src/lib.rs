//! usbwatch: USB hotplug monitor built on kernel uevents
//!
//! Datagrams from the `NETLINK_KOBJECT_UEVENT` socket are decoded into
//! key/value records, filtered down to USB devices and USB mass storage,
//! and tracked in a registry that reports connect/disconnect transitions.

pub mod config;
pub mod device;
pub mod enrich;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod uevent;
pub mod utils;

pub use config::MonitorConfig;
pub use device::{classify, ClassifiedEvent, DeviceKey, DeviceRegistry, Transition};
pub use enrich::{DeviceLabeler, RecordLabeler, SystemLabeler};
pub use error::{ChannelError, ConfigError};
pub use monitor::{EventSink, LoopControl, MonitorEvent, MonitorLoop, UsbMonitor};
pub use uevent::{decode, EventChannel, MulticastGroup, NetlinkChannel, RawEvent, UEventRecord};
