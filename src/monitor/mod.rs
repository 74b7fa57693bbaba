//! USB hotplug monitoring
//!
//! [`MonitorLoop`] drives channel → decoder → classifier → registry on a
//! single task and reports transitions as [`MonitorEvent`]s.
//! [`UsbMonitor`] is the start/stop surface the rest of the program uses.

pub mod controller;
pub mod events;
pub mod worker;

pub use controller::{ChannelFactory, UsbMonitor};
pub use events::{EventSink, MonitorEvent};
pub use worker::{LoopControl, LoopStats, MonitorLoop};
