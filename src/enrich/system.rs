use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{devname_basename, DeviceLabeler, UNKNOWN_DEVICE};
use crate::config::EnrichmentConfig;
use crate::device::{ClassifiedEvent, Subsystem};

/// Columns requested from lsblk, in output order
const LSBLK_COLUMNS: &str = "NAME,MODEL,SIZE,FSTYPE,TRAN";

/// Labels devices by asking `lsusb` and `lsblk`
#[derive(Debug, Clone)]
pub struct SystemLabeler {
    lsusb: String,
    lsblk: String,
    timeout: Duration,
}

impl SystemLabeler {
    pub fn new(config: &EnrichmentConfig) -> Self {
        Self {
            lsusb: config.lsusb_program.clone(),
            lsblk: config.lsblk_program.clone(),
            timeout: Duration::from_millis(config.command_timeout_ms),
        }
    }

    /// Run a program and collect stdout. Any failure is logged and mapped to
    /// `None`; callers fall back to whatever the uevent itself carries.
    async fn run(&self, program: &str, args: &[&str]) -> Option<String> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(program, error = %e, "failed to spawn enrichment command");
                return None;
            }
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    debug!(program, status = %output.status, "enrichment command exited unsuccessfully");
                }
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Err(e)) => {
                warn!(program, error = %e, "enrichment command failed");
                None
            }
            Err(_) => {
                warn!(program, timeout_ms = self.timeout.as_millis() as u64, "enrichment command timed out");
                None
            }
        }
    }

    async fn describe_usb(&self, event: &ClassifiedEvent) -> String {
        let Some(product) = event.record.product() else {
            return String::new();
        };

        let fallback = || {
            format!(
                "Device: {}",
                event.record.id_model().unwrap_or(UNKNOWN_DEVICE)
            )
        };

        let Some((vid, pid)) = parse_product(product) else {
            debug!(product, "unparseable PRODUCT field");
            return fallback();
        };

        let id = format!("{}:{}", vid, pid);
        self.run(&self.lsusb, &["-d", &id])
            .await
            .and_then(|output| parse_lsusb(&output, &vid, &pid))
            .map(|description| format!("Device: {}", description))
            .unwrap_or_else(fallback)
    }

    async fn describe_block(&self, event: &ClassifiedEvent) -> String {
        let Some(devname) = event.record.devname() else {
            return String::new();
        };
        let name = devname_basename(devname);
        if name.is_empty() {
            return String::new();
        }

        self.run(&self.lsblk, &["-o", LSBLK_COLUMNS, "-l"])
            .await
            .and_then(|output| parse_lsblk(&output, name))
            .map(|lines| format!("Storage: {}", lines))
            .unwrap_or_default()
    }
}

#[async_trait]
impl DeviceLabeler for SystemLabeler {
    async fn describe(&self, event: &ClassifiedEvent) -> String {
        match event.subsystem {
            Subsystem::Usb => self.describe_usb(event).await,
            Subsystem::Block => self.describe_block(event).await,
        }
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

/// `PRODUCT=46d/c52b/1201` -> (`046d`, `c52b`)
pub fn parse_product(product: &str) -> Option<(String, String)> {
    let mut parts = product.split('/');
    let vid = u16::from_str_radix(parts.next()?, 16).ok()?;
    let pid = u16::from_str_radix(parts.next()?, 16).ok()?;
    Some((format!("{:04x}", vid), format!("{:04x}", pid)))
}

/// Pull the description after `vid:pid` out of an `lsusb -d` line:
///
/// ```text
/// Bus 001 Device 005: ID 046d:c52b Logitech, Inc. Unifying Receiver
/// ```
pub fn parse_lsusb(output: &str, vid: &str, pid: &str) -> Option<String> {
    let id = format!("{}:{}", vid, pid);
    let line = output.lines().find(|line| line.contains(&id))?;
    let pos = line.find(&id)?;
    let description = line[pos + id.len()..].trim();
    if description.is_empty() {
        None
    } else {
        Some(description.to_string())
    }
}

/// Rows of `lsblk -l` output for `name` and its partitions
pub fn parse_lsblk(output: &str, name: &str) -> Option<String> {
    let rows: Vec<&str> = output
        .lines()
        .filter(|line| {
            line.split_whitespace()
                .next()
                .map_or(false, |first| first.starts_with(name))
        })
        .map(str::trim_end)
        .collect();

    if rows.is_empty() {
        None
    } else {
        Some(rows.join("\n"))
    }
}
