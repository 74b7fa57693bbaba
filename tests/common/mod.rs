// Shared fakes for the integration tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use usbwatch::device::ClassifiedEvent;
use usbwatch::enrich::DeviceLabeler;
use usbwatch::error::ChannelError;
use usbwatch::monitor::{ChannelFactory, MonitorEvent};
use usbwatch::uevent::{ChannelState, EventChannel, RawEvent, LIBUDEV_MAGIC, LIBUDEV_PREFIX};

pub const READ_TIMEOUT: Duration = Duration::from_millis(20);

/// One scripted read result
#[derive(Debug, Clone)]
pub enum Step {
    Data(Vec<u8>),
    Timeout,
    Fail,
}

/// Open/close counters shared by every channel a factory hands out
#[derive(Debug, Clone, Default)]
pub struct ChannelProbe {
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl ChannelProbe {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Channel replaying a fixed list of reads, then idling like a quiet socket
pub struct ScriptedChannel {
    steps: VecDeque<Step>,
    fail_open: bool,
    state: ChannelState,
    probe: ChannelProbe,
}

impl ScriptedChannel {
    pub fn new(steps: Vec<Step>, probe: ChannelProbe) -> Self {
        Self {
            steps: steps.into(),
            fail_open: false,
            state: ChannelState::Closed,
            probe,
        }
    }

    pub fn failing_open(probe: ChannelProbe) -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new(), probe)
        }
    }
}

#[async_trait]
impl EventChannel for ScriptedChannel {
    async fn open(&mut self) -> Result<(), ChannelError> {
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(ChannelError::Bind(io::Error::from(io::ErrorKind::PermissionDenied)));
        }
        self.state = ChannelState::Open;
        Ok(())
    }

    async fn read_timeout(&mut self, wait: Duration) -> Result<Option<RawEvent>, ChannelError> {
        if self.state != ChannelState::Open {
            return Err(ChannelError::NotOpen);
        }
        match self.steps.pop_front() {
            Some(Step::Data(payload)) => Ok(Some(RawEvent::new(payload))),
            Some(Step::Timeout) => Ok(None),
            Some(Step::Fail) => Err(ChannelError::Read(io::Error::new(
                io::ErrorKind::Other,
                "scripted failure",
            ))),
            None => {
                tokio::time::sleep(wait).await;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.state = ChannelState::Closed;
    }

    fn state(&self) -> ChannelState {
        self.state
    }
}

/// Factory producing a fresh copy of `steps` for every session
pub fn scripted_factory(steps: Vec<Step>, probe: &ChannelProbe) -> ChannelFactory {
    let probe = probe.clone();
    Arc::new(move || Box::new(ScriptedChannel::new(steps.clone(), probe.clone())) as Box<dyn EventChannel>)
}

/// Labeler handing out queued labels, then a fixed default
pub struct FixedLabeler {
    queued: Mutex<VecDeque<String>>,
    default: String,
    calls: AtomicUsize,
}

impl FixedLabeler {
    pub fn new(default: &str) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            default: default.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_queue(default: &str, labels: &[&str]) -> Self {
        let labeler = Self::new(default);
        labeler
            .queued
            .lock()
            .unwrap()
            .extend(labels.iter().map(|label| label.to_string()));
        labeler
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceLabeler for FixedLabeler {
    async fn describe(&self, _event: &ClassifiedEvent) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Kernel-format payload from key/value pairs
pub fn uevent(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut payload = Vec::new();
    for (key, value) in fields {
        payload.extend_from_slice(key.as_bytes());
        payload.push(b'=');
        payload.extend_from_slice(value.as_bytes());
        payload.push(0);
    }
    payload
}

#[allow(dead_code)]
pub fn usb_event(action: &str, devpath: &str) -> Vec<u8> {
    uevent(&[
        ("ACTION", action),
        ("DEVPATH", devpath),
        ("SUBSYSTEM", "usb"),
        ("PRODUCT", "46d/c52b/1201"),
    ])
}

/// Same properties wrapped in the header udevd puts in front of them
#[allow(dead_code)]
pub fn libudev_framed(properties: &[u8]) -> Vec<u8> {
    const HEADER_SIZE: u32 = 40;
    let mut payload = Vec::new();
    payload.extend_from_slice(LIBUDEV_PREFIX);
    payload.extend_from_slice(&LIBUDEV_MAGIC.to_be_bytes());
    payload.extend_from_slice(&HEADER_SIZE.to_ne_bytes());
    payload.extend_from_slice(&HEADER_SIZE.to_ne_bytes());
    payload.extend_from_slice(&(properties.len() as u32).to_ne_bytes());
    payload.resize(HEADER_SIZE as usize, 0);
    payload.extend_from_slice(properties);
    payload
}

/// Next `count` Connected/Disconnected events, skipping log lines
#[allow(dead_code)]
pub async fn next_device_events(rx: &mut UnboundedReceiver<MonitorEvent>, count: usize) -> Vec<MonitorEvent> {
    let mut seen = Vec::new();
    while seen.len() < count {
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for device event")
            .expect("event channel closed");
        match event {
            MonitorEvent::Connected { .. } | MonitorEvent::Disconnected { .. } => seen.push(event),
            MonitorEvent::Finished => panic!("session finished early, got {:?}", seen),
            MonitorEvent::Log(_) => {}
        }
    }
    seen
}

/// Everything up to and including `Finished`
#[allow(dead_code)]
pub async fn drain_until_finished(rx: &mut UnboundedReceiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut seen = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for Finished")
            .expect("event channel closed");
        let finished = event.is_finished();
        seen.push(event);
        if finished {
            return seen;
        }
    }
}

#[allow(dead_code)]
pub fn device_events(events: &[MonitorEvent]) -> Vec<MonitorEvent> {
    events
        .iter()
        .filter(|event| matches!(event, MonitorEvent::Connected { .. } | MonitorEvent::Disconnected { .. }))
        .cloned()
        .collect()
}

#[allow(dead_code)]
pub fn connected(label: &str, key: &str) -> MonitorEvent {
    MonitorEvent::Connected {
        label: label.to_string(),
        composite_key: format!("{}:{}", key, label),
    }
}

#[allow(dead_code)]
pub fn disconnected(label: &str, key: &str) -> MonitorEvent {
    MonitorEvent::Disconnected {
        label: label.to_string(),
        composite_key: format!("{}:{}", key, label),
    }
}
