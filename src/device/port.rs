use std::fmt;

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `BUS-PORT[.PORT]*`, e.g. `1-1` or `3-2.4.1`
fn is_port_address(segment: &str) -> bool {
    match segment.split_once('-') {
        Some((bus, ports)) => is_number(bus) && ports.split('.').all(is_number),
        None => false,
    }
}

/// USB port address such as `1-1.4` (bus 1, root port 1, hub port 4)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortId(String);

impl PortId {
    /// Port address at the end of `devpath`, if its last segment is one.
    ///
    /// Not consulted by the add/remove logic.
    pub fn from_devpath(devpath: &str) -> Option<Self> {
        let segment = devpath.rsplit('/').next()?;
        is_port_address(segment).then(|| PortId(segment.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn bus(&self) -> Option<u32> {
        self.0.split('-').next()?.parse().ok()
    }

    /// Port numbers from the root hub down, `1-1.4.2` gives `[1, 4, 2]`
    pub fn chain(&self) -> Vec<u32> {
        self.0
            .split_once('-')
            .map(|(_, ports)| ports.split('.').filter_map(|p| p.parse().ok()).collect())
            .unwrap_or_default()
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
