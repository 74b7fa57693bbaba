use byteorder::{BigEndian, ByteOrder, NativeEndian};
use std::collections::BTreeMap;
use tracing::trace;

use crate::utils::hex_preview;

/// Prefix of datagrams re-broadcast by udevd
pub const LIBUDEV_PREFIX: &[u8] = b"libudev\0";
/// Magic number following the prefix, stored big-endian
pub const LIBUDEV_MAGIC: u32 = 0xfeed_cafe;
/// prefix(8) + magic + header_size + properties_off + properties_len
const LIBUDEV_MIN_HEADER: usize = 24;

/// Decoded uevent: the fields the classifier reads, plus everything else
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UEventRecord {
    action: Option<String>,
    devpath: Option<String>,
    subsystem: Option<String>,
    id_bus: Option<String>,
    product: Option<String>,
    id_model: Option<String>,
    devname: Option<String>,
    extra: BTreeMap<String, String>,
}

impl UEventRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a field; a repeated key replaces the earlier value
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let slot = match key {
            "ACTION" => &mut self.action,
            "DEVPATH" => &mut self.devpath,
            "SUBSYSTEM" => &mut self.subsystem,
            "ID_BUS" => &mut self.id_bus,
            "PRODUCT" => &mut self.product,
            "ID_MODEL" => &mut self.id_model,
            "DEVNAME" => &mut self.devname,
            _ => {
                self.extra.insert(key.to_string(), value);
                return;
            }
        };
        *slot = Some(value);
    }

    /// Builder-style insert, handy when assembling records by hand
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "ACTION" => self.action(),
            "DEVPATH" => self.devpath(),
            "SUBSYSTEM" => self.subsystem.as_deref(),
            "ID_BUS" => self.id_bus(),
            "PRODUCT" => self.product(),
            "ID_MODEL" => self.id_model(),
            "DEVNAME" => self.devname(),
            _ => self.extra.get(key).map(String::as_str),
        }
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn devpath(&self) -> Option<&str> {
        self.devpath.as_deref()
    }

    /// `SUBSYSTEM`, empty when absent
    pub fn subsystem(&self) -> &str {
        self.subsystem.as_deref().unwrap_or("")
    }

    pub fn id_bus(&self) -> Option<&str> {
        self.id_bus.as_deref()
    }

    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    pub fn id_model(&self) -> Option<&str> {
        self.id_model.as_deref()
    }

    pub fn devname(&self) -> Option<&str> {
        self.devname.as_deref()
    }

    /// Fields without a dedicated accessor, ordered by key
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    pub fn len(&self) -> usize {
        [
            &self.action,
            &self.devpath,
            &self.subsystem,
            &self.id_bus,
            &self.product,
            &self.id_model,
            &self.devname,
        ]
        .iter()
        .filter(|field| field.is_some())
        .count()
            + self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode one uevent datagram.
///
/// Never fails: anything malformed just yields fewer fields.
pub fn decode(payload: &[u8]) -> UEventRecord {
    let properties = if payload.starts_with(LIBUDEV_PREFIX) {
        match libudev_properties(payload) {
            Some(properties) => properties,
            None => {
                trace!(
                    len = payload.len(),
                    header = %hex_preview(payload, Some(LIBUDEV_MIN_HEADER)),
                    "malformed libudev header, dropping payload"
                );
                return UEventRecord::new();
            }
        }
    } else {
        payload
    };

    let mut record = UEventRecord::new();
    for line in properties.split(|&b| b == 0) {
        if line.is_empty() {
            continue;
        }
        let line = String::from_utf8_lossy(line);
        if let Some((key, value)) = line.split_once('=') {
            record.insert(key, value);
        }
    }
    record
}

/// Slice out the property block of a udevd datagram
fn libudev_properties(payload: &[u8]) -> Option<&[u8]> {
    if payload.len() < LIBUDEV_MIN_HEADER {
        return None;
    }
    if BigEndian::read_u32(&payload[8..12]) != LIBUDEV_MAGIC {
        return None;
    }

    let header_size = NativeEndian::read_u32(&payload[12..16]) as usize;
    let offset = NativeEndian::read_u32(&payload[16..20]) as usize;
    let len = NativeEndian::read_u32(&payload[20..24]) as usize;

    if offset < header_size.min(LIBUDEV_MIN_HEADER) {
        return None;
    }
    let end = offset.checked_add(len)?;
    payload.get(offset..end)
}
