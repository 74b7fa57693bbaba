use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::{EventSink, MonitorEvent};
use super::worker::{LoopControl, MonitorLoop};
use crate::config::MonitorConfig;
use crate::device::DeviceRegistry;
use crate::enrich::{DeviceLabeler, RecordLabeler, SystemLabeler};
use crate::uevent::{EventChannel, NetlinkChannel};

/// Builds a fresh channel for every monitoring session
pub type ChannelFactory = Arc<dyn Fn() -> Box<dyn EventChannel> + Send + Sync>;

/// Start/stop control surface around [`MonitorLoop`].
///
/// The loop itself runs on its own tokio task; this type only flips flags
/// and keeps the registry between sessions.
pub struct UsbMonitor {
    channel_factory: ChannelFactory,
    labeler: Arc<dyn DeviceLabeler>,
    events: EventSink,
    read_timeout: Duration,
    control: LoopControl,
    registry: Option<DeviceRegistry>,
    handle: Option<JoinHandle<DeviceRegistry>>,
}

impl UsbMonitor {
    pub fn new(
        channel_factory: ChannelFactory,
        labeler: Arc<dyn DeviceLabeler>,
        events: EventSink,
        read_timeout: Duration,
    ) -> Self {
        Self {
            channel_factory,
            labeler,
            events,
            read_timeout,
            control: LoopControl::new(),
            registry: Some(DeviceRegistry::new()),
            handle: None,
        }
    }

    /// Netlink channel plus the labeler selected by `config`
    pub fn from_config(config: &MonitorConfig, events: EventSink) -> Self {
        let group = config.channel.group;
        let channel_factory: ChannelFactory =
            Arc::new(move || Box::new(NetlinkChannel::new(group)) as Box<dyn EventChannel>);

        let labeler: Arc<dyn DeviceLabeler> = if config.enrichment.enabled {
            Arc::new(SystemLabeler::new(&config.enrichment))
        } else {
            Arc::new(RecordLabeler)
        };
        info!(group = %group, labeler = labeler.name(), "USB monitor configured");

        Self::new(channel_factory, labeler, events, config.channel.read_timeout())
    }

    /// Spawn the monitoring loop. A second start while running only logs.
    pub async fn start_monitoring(&mut self) {
        if self.control.is_running() {
            warn!("USB monitoring is already running");
            self.events.emit(MonitorEvent::Log("Monitoring is already running.".to_string()));
            return;
        }

        // A previous session may have ended on its own; take its registry back.
        self.reap().await;

        let control = LoopControl::new();
        control.mark_running();
        self.control = control.clone();

        let registry = self.registry.take().unwrap_or_default();
        let worker = MonitorLoop::new(
            (self.channel_factory)(),
            Arc::clone(&self.labeler),
            self.events.clone(),
            self.read_timeout,
        )
        .with_registry(registry);

        self.handle = Some(tokio::spawn(worker.run(control)));
        debug!("USB monitoring task spawned");
    }

    /// Request the loop to stop. Returns immediately; the loop notices
    /// within one read timeout.
    pub fn stop_monitoring(&self) {
        self.events.log("Stopping monitoring...");
        self.control.request_stop();
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    /// Wait for the current session to end and return the registry it left.
    ///
    /// Does not request a stop by itself.
    pub async fn wait(&mut self) -> Option<&DeviceRegistry> {
        self.reap().await;
        self.registry.as_ref()
    }

    /// Registry of the last finished session; `None` while a loop owns it
    pub fn registry(&self) -> Option<&DeviceRegistry> {
        self.registry.as_ref()
    }

    async fn reap(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        match handle.await {
            Ok(registry) => {
                self.registry = Some(registry);
            }
            Err(e) => {
                warn!("USB monitoring task finished with error: {}", e);
                self.control.mark_stopped();
                self.registry = Some(DeviceRegistry::new());
            }
        }
    }
}

impl Drop for UsbMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.control.request_stop();
            handle.abort();
        }
        debug!("UsbMonitor dropped and cleaned up");
    }
}
