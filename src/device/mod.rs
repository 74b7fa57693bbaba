//! Device classification and the connected-device registry

pub mod classifier;
pub mod key;
pub mod port;
pub mod registry;

pub use classifier::{classify, Action, ClassifiedEvent, Rejection, Subsystem};
pub use key::DeviceKey;
pub use port::PortId;
pub use registry::{DeviceRegistry, Transition};
