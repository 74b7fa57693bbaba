//! Kernel uevent ingestion
//!
//! `channel` defines the `EventChannel` abstraction the monitor reads from,
//! `netlink` is the production implementation on top of a
//! `NETLINK_KOBJECT_UEVENT` socket, and `decoder` turns one datagram into a
//! `UEventRecord`.

pub mod channel;
pub mod decoder;
pub mod netlink;

pub use channel::{ChannelState, EventChannel, MulticastGroup, RawEvent};
pub use decoder::{decode, UEventRecord, LIBUDEV_MAGIC, LIBUDEV_PREFIX};
pub use netlink::NetlinkChannel;
