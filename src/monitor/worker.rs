use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace};

use super::events::{EventSink, MonitorEvent};
use crate::device::{classify, DeviceRegistry, PortId, Transition};
use crate::enrich::DeviceLabeler;
use crate::logging::log_device_event;
use crate::uevent::{decode, EventChannel, RawEvent};
use crate::utils::payload_summary;

/// Cooperative stop flag shared between the loop and its controller
#[derive(Debug, Clone, Default)]
pub struct LoopControl {
    stop_requested: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl LoopControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to exit; observed between reads
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_running(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mark_stopped(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Counters for one monitoring session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub datagrams: u64,
    pub rejected: u64,
    pub connected: u64,
    pub disconnected: u64,
}

/// The ingestion loop: read, decode, classify, apply, notify
pub struct MonitorLoop {
    channel: Box<dyn EventChannel>,
    labeler: Arc<dyn DeviceLabeler>,
    registry: DeviceRegistry,
    events: EventSink,
    read_timeout: Duration,
    stats: LoopStats,
}

impl MonitorLoop {
    pub fn new(
        channel: Box<dyn EventChannel>,
        labeler: Arc<dyn DeviceLabeler>,
        events: EventSink,
        read_timeout: Duration,
    ) -> Self {
        Self {
            channel,
            labeler,
            registry: DeviceRegistry::new(),
            events,
            read_timeout,
            stats: LoopStats::default(),
        }
    }

    /// Start from an existing registry, e.g. the one left by a previous session
    pub fn with_registry(mut self, registry: DeviceRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Run until `control` requests a stop or the channel fails.
    ///
    /// Always ends with `Finished`; the channel is closed on every path.
    /// Returns the registry so a later session can pick it up.
    pub async fn run(mut self, control: LoopControl) -> DeviceRegistry {
        control.mark_running();

        if let Err(e) = self.channel.open().await {
            error!("Failed to open uevent channel: {}", e);
            self.channel.close();
            self.events.log(format!("Error: {}", e));
            control.mark_stopped();
            self.events.emit(MonitorEvent::Finished);
            return self.registry;
        }

        self.events.log("Started monitoring USB events...");

        while !control.is_stop_requested() {
            match self.channel.read_timeout(self.read_timeout).await {
                Ok(Some(raw)) => {
                    self.process(&raw).await;
                }
                Ok(None) => continue,
                Err(e) => {
                    error!("uevent channel read failed: {}", e);
                    self.events.log(format!("Error: {}", e));
                    break;
                }
            }
        }

        self.channel.close();
        info!(
            datagrams = self.stats.datagrams,
            rejected = self.stats.rejected,
            connected = self.stats.connected,
            disconnected = self.stats.disconnected,
            tracked = self.registry.len(),
            "uevent loop finished"
        );
        self.events.log("Monitoring stopped.");
        control.mark_stopped();
        self.events.emit(MonitorEvent::Finished);

        self.registry
    }

    /// Handle one datagram and emit whatever it changed
    pub async fn process(&mut self, raw: &RawEvent) -> Transition {
        self.stats.datagrams += 1;
        trace!(payload = %payload_summary(raw.payload(), None), "uevent datagram");

        let event = match classify(decode(raw.payload())) {
            Ok(event) => event,
            Err(rejection) => {
                self.stats.rejected += 1;
                trace!(%rejection, "uevent rejected");
                return Transition::NoOp;
            }
        };

        debug!(
            action = %event.action,
            subsystem = %event.subsystem,
            key = %event.key,
            port = ?PortId::from_devpath(event.key.as_str()),
            "uevent classified"
        );

        let labeler = &self.labeler;
        let transition = self
            .registry
            .apply(&event, |event| labeler.describe(event))
            .await;

        match &transition {
            Transition::Added { key, label } => {
                self.stats.connected += 1;
                log_device_event("added", key.as_str(), label);
            }
            Transition::Removed { key, label } => {
                self.stats.disconnected += 1;
                log_device_event("removed", key.as_str(), label);
            }
            Transition::NoOp => {}
        }

        if let Some(outbound) = MonitorEvent::from_transition(&transition) {
            self.events.emit(outbound);
        }

        transition
    }
}
