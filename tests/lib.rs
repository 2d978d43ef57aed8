//! Shared fixtures for HOPGATE integration tests.

use hopgate_core::{
    Address, AddressMode, Digipeater, DigipeaterConfig, Igate, IgateConfig, Packet, PreemptMode,
    Priority, QueuedFrame, ServerLink, TransmitQueue,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Alias pattern used by the classic digipeater vectors
pub const CLASSIC_ALIAS: &str = r"^WIDE[4-7]-[1-7]|CITYD$";

/// Wide pattern used by the classic digipeater vectors
pub const CLASSIC_WIDE: &str = r"^WIDE[1-7]-[1-7]$|^TRACE[1-7]-[1-7]$|^MA[1-7]-[1-7]$";

/// Station call used by the classic digipeater vectors
pub const CLASSIC_MYCALL: &str = "WB2OSZ-9";

/// Parse a monitor-format packet, panicking on bad input
pub fn packet(text: &str) -> Packet {
    Packet::from_text(text, AddressMode::Strict)
        .unwrap_or_else(|e| panic!("bad test packet {text:?}: {e}"))
}

/// Parse a station call
pub fn call(text: &str) -> Address {
    text.parse()
        .unwrap_or_else(|e| panic!("bad test call {text:?}: {e}"))
}

/// [`TransmitQueue`] that keeps everything handed to it
#[derive(Debug, Default)]
pub struct RecordingQueue {
    frames: Mutex<Vec<QueuedFrame>>,
}

impl RecordingQueue {
    /// Remove and return everything queued so far
    pub fn take(&self) -> Vec<QueuedFrame> {
        std::mem::take(&mut *self.frames.lock().unwrap())
    }

    /// Monitor-format text of everything queued so far, draining the queue
    pub fn take_text(&self) -> Vec<String> {
        self.take().into_iter().map(|f| f.packet.to_string()).collect()
    }
}

impl TransmitQueue for RecordingQueue {
    fn enqueue(&self, channel: usize, priority: Priority, packet: Packet) {
        self.frames.lock().unwrap().push(QueuedFrame {
            channel,
            priority,
            packet,
        });
    }
}

/// [`ServerLink`] that keeps every line sent
#[derive(Debug)]
pub struct RecordingLink {
    connected: AtomicBool,
    lines: Mutex<Vec<String>>,
}

impl Default for RecordingLink {
    fn default() -> Self {
        Self {
            connected: AtomicBool::new(true),
            lines: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingLink {
    /// Simulate login or disconnect
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Remove and return every line sent so far
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap())
    }
}

impl ServerLink for RecordingLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn send_line(&self, line: &[u8]) {
        self.lines
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(line).into_owned());
    }
}

/// Single-channel digipeater using the classic patterns
pub fn classic_digipeater(
    preempt: PreemptMode,
    dedupe_time: Duration,
) -> (Digipeater, Arc<RecordingQueue>) {
    let config = DigipeaterConfig::builder(vec![call(CLASSIC_MYCALL)])
        .dedupe_time(dedupe_time)
        .pair(0, 0, CLASSIC_ALIAS, CLASSIC_WIDE, preempt)
        .unwrap()
        .build()
        .unwrap();
    let queue = Arc::new(RecordingQueue::default());
    let digi = Digipeater::new(Arc::new(config), queue.clone());
    (digi, queue)
}

/// IGate with recording collaborators
pub fn recording_igate(
    config: IgateConfig,
    mycalls: &[&str],
) -> (Igate, Arc<RecordingLink>, Arc<RecordingQueue>) {
    let link = Arc::new(RecordingLink::default());
    let queue = Arc::new(RecordingQueue::default());
    let igate = Igate::new(
        config,
        mycalls.iter().map(|c| call(c)).collect(),
        link.clone(),
        queue.clone(),
    )
    .unwrap();
    (igate, link, queue)
}
