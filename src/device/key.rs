use std::fmt;

/// Registry identity of a physical device: the parent of the event's `DEVPATH`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey(String);

impl DeviceKey {
    /// Parent directory of `devpath`, `None` when it has no `/` separator
    pub fn from_devpath(devpath: &str) -> Option<Self> {
        devpath
            .rfind('/')
            .map(|idx| DeviceKey(devpath[..idx].to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `key:label`, the correlation string handed to consumers
    pub fn composite(&self, label: &str) -> String {
        format!("{}:{}", self.0, label)
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceKey {
    fn from(s: &str) -> Self {
        DeviceKey(s.to_string())
    }
}

impl From<String> for DeviceKey {
    fn from(s: String) -> Self {
        DeviceKey(s)
    }
}

impl AsRef<str> for DeviceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
