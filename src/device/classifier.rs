use std::fmt;

use super::key::DeviceKey;
use crate::uevent::UEventRecord;

/// Marker that precedes the bus number in USB device paths
const USB_MARKER: &str = "/usb";

/// Uevent action as far as the registry cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
    /// `bind`, `change`, `unbind`, ... pass classification but change nothing
    Other(String),
}

impl Action {
    pub fn parse(action: &str) -> Self {
        match action {
            "add" => Action::Add,
            "remove" => Action::Remove,
            other => Action::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Add => f.write_str("add"),
            Action::Remove => f.write_str("remove"),
            Action::Other(other) => f.write_str(other),
        }
    }
}

/// Subsystems that make it through classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Usb,
    Block,
}

impl Subsystem {
    pub fn name(&self) -> &'static str {
        match self {
            Subsystem::Usb => "usb",
            Subsystem::Block => "block",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why an event was dropped. Rejection is the normal filtering path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingAction,
    MissingDevpath,
    UnsupportedSubsystem(String),
    /// Block device not sitting on the USB bus
    NotUsbStorage,
    NoParentSegment,
    /// Bus or root hub node rather than a device behind a port
    UsbContainerNode,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingAction => write!(f, "missing ACTION"),
            Rejection::MissingDevpath => write!(f, "missing DEVPATH"),
            Rejection::UnsupportedSubsystem(s) => write!(f, "unsupported subsystem '{}'", s),
            Rejection::NotUsbStorage => write!(f, "block device not on USB bus"),
            Rejection::NoParentSegment => write!(f, "DEVPATH has no parent segment"),
            Rejection::UsbContainerNode => write!(f, "USB bus or hub container node"),
        }
    }
}

/// Event that passed classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEvent {
    pub action: Action,
    pub key: DeviceKey,
    pub subsystem: Subsystem,
    pub record: UEventRecord,
}

impl ClassifiedEvent {
    pub fn is_add(&self) -> bool {
        self.action == Action::Add
    }

    pub fn is_remove(&self) -> bool {
        self.action == Action::Remove
    }
}

/// Decide whether `record` describes a USB device or USB-backed block device
pub fn classify(record: UEventRecord) -> Result<ClassifiedEvent, Rejection> {
    let action = record.action().ok_or(Rejection::MissingAction)?;
    let devpath = record.devpath().ok_or(Rejection::MissingDevpath)?;

    let subsystem = match record.subsystem() {
        "usb" => Subsystem::Usb,
        "block" => Subsystem::Block,
        other => return Err(Rejection::UnsupportedSubsystem(other.to_string())),
    };

    if subsystem == Subsystem::Block && record.id_bus() != Some("usb") {
        return Err(Rejection::NotUsbStorage);
    }

    let key = DeviceKey::from_devpath(devpath).ok_or(Rejection::NoParentSegment)?;

    if subsystem == Subsystem::Usb && is_usb_container(key.as_str()) {
        return Err(Rejection::UsbContainerNode);
    }

    Ok(ClassifiedEvent {
        action: Action::parse(action),
        key,
        subsystem,
        record,
    })
}

/// A real USB device path always carries a port address (`1-2`, `3-1.4`)
/// somewhere after the `/usbN` bus segment.
fn is_usb_container(parent_path: &str) -> bool {
    match parent_path.find(USB_MARKER) {
        Some(pos) => !parent_path[pos + USB_MARKER.len()..].contains('-'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUB_PATH: &str = "/devices/pci0000:00/0000:00:14.0/usb1";

    fn usb_record(action: &str, devpath: &str) -> UEventRecord {
        UEventRecord::new()
            .with("ACTION", action)
            .with("DEVPATH", devpath)
            .with("SUBSYSTEM", "usb")
    }

    #[test]
    fn test_usb_interface_is_accepted_with_device_key() {
        let event = classify(usb_record("add", &format!("{}/1-1/1-1:1.0", HUB_PATH))).unwrap();
        assert_eq!(event.action, Action::Add);
        assert_eq!(event.subsystem, Subsystem::Usb);
        assert_eq!(event.key.as_str(), format!("{}/1-1", HUB_PATH));
        assert!(event.is_add());
    }

    #[test]
    fn test_root_hub_interface_is_rejected() {
        let result = classify(usb_record("add", &format!("{}/1-0:1.0", HUB_PATH)));
        assert_eq!(result.unwrap_err(), Rejection::UsbContainerNode);
    }

    #[test]
    fn test_device_directly_under_bus_is_rejected() {
        let result = classify(usb_record("add", &format!("{}/1-1", HUB_PATH)));
        assert_eq!(result.unwrap_err(), Rejection::UsbContainerNode);
    }

    #[test]
    fn test_nested_hub_device_is_accepted() {
        let event = classify(usb_record("remove", &format!("{}/1-2/1-2.3/1-2.3:1.1", HUB_PATH))).unwrap();
        assert_eq!(event.action, Action::Remove);
        assert_eq!(event.key.as_str(), format!("{}/1-2/1-2.3", HUB_PATH));
    }

    #[test]
    fn test_usb_path_without_marker_is_accepted() {
        let event = classify(usb_record("add", "/devices/platform/dwc2/port1")).unwrap();
        assert_eq!(event.key.as_str(), "/devices/platform/dwc2");
    }

    #[test]
    fn test_missing_required_fields() {
        let no_action = UEventRecord::new().with("DEVPATH", "/devices/x").with("SUBSYSTEM", "usb");
        assert_eq!(classify(no_action).unwrap_err(), Rejection::MissingAction);

        let no_devpath = UEventRecord::new().with("ACTION", "add").with("SUBSYSTEM", "usb");
        assert_eq!(classify(no_devpath).unwrap_err(), Rejection::MissingDevpath);
    }

    #[test]
    fn test_missing_action_wins_over_bad_subsystem() {
        let record = UEventRecord::new().with("SUBSYSTEM", "net");
        assert_eq!(classify(record).unwrap_err(), Rejection::MissingAction);
    }

    #[test]
    fn test_other_subsystems_rejected() {
        let record = UEventRecord::new()
            .with("ACTION", "add")
            .with("DEVPATH", "/devices/virtual/net/wlan0")
            .with("SUBSYSTEM", "net");
        assert_eq!(
            classify(record).unwrap_err(),
            Rejection::UnsupportedSubsystem("net".to_string())
        );

        let no_subsystem = UEventRecord::new()
            .with("ACTION", "add")
            .with("DEVPATH", "/devices/x/y");
        assert_eq!(
            classify(no_subsystem).unwrap_err(),
            Rejection::UnsupportedSubsystem(String::new())
        );
    }

    #[test]
    fn test_block_device_bus_filter() {
        let base = UEventRecord::new()
            .with("ACTION", "add")
            .with("DEVPATH", "/devices/pci0000:00/0000:00:14.0/usb2/2-1/2-1:1.0/host6/target6:0:0/6:0:0:0/block/sdb")
            .with("SUBSYSTEM", "block");

        assert_eq!(classify(base.clone()).unwrap_err(), Rejection::NotUsbStorage);
        assert_eq!(
            classify(base.clone().with("ID_BUS", "ata")).unwrap_err(),
            Rejection::NotUsbStorage
        );

        let event = classify(base.with("ID_BUS", "usb")).unwrap();
        assert_eq!(event.subsystem, Subsystem::Block);
        assert!(event.key.as_str().ends_with("/6:0:0:0/block"));
    }

    #[test]
    fn test_block_devices_skip_hyphen_rule() {
        let record = UEventRecord::new()
            .with("ACTION", "add")
            .with("DEVPATH", "/devices/usb1/block/sdc")
            .with("SUBSYSTEM", "block")
            .with("ID_BUS", "usb");
        assert!(classify(record).is_ok());
    }

    #[test]
    fn test_devpath_without_separator() {
        let result = classify(usb_record("add", "1-1"));
        assert_eq!(result.unwrap_err(), Rejection::NoParentSegment);
    }

    #[test]
    fn test_other_actions_pass() {
        let event = classify(usb_record("bind", &format!("{}/1-4/1-4:1.0", HUB_PATH))).unwrap();
        assert_eq!(event.action, Action::Other("bind".to_string()));
        assert!(!event.is_add());
        assert!(!event.is_remove());
        assert_eq!(event.action.to_string(), "bind");
    }
}
