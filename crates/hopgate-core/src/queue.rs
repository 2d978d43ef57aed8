//! Collaborators outside the decision layer.
//!
//! The core never touches a radio or a socket. Repeats and gated packets go
//! to a [`TransmitQueue`]; lines for APRS-IS go to a [`ServerLink`]. The
//! channel-backed implementations here feed tokio tasks that own the real
//! I/O.

use crate::packet::Packet;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Transmit queue priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Sent ahead of anything queued at low priority
    High,
    /// Normal traffic
    Low,
}

/// Sink for packets to transmit on a radio channel
pub trait TransmitQueue: Send + Sync {
    /// Queue `packet` for transmission on `channel`
    fn enqueue(&self, channel: usize, priority: Priority, packet: Packet);
}

/// Connection to an APRS-IS server
pub trait ServerLink: Send + Sync {
    /// Whether the login has completed and the link is usable
    fn is_connected(&self) -> bool;

    /// Send one complete line, including the trailing CR LF
    fn send_line(&self, line: &[u8]);
}

/// A packet waiting for a transmitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFrame {
    /// Radio channel
    pub channel: usize,
    /// Queue priority
    pub priority: Priority,
    /// Packet to send
    pub packet: Packet,
}

/// [`TransmitQueue`] backed by an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelQueue {
    tx: mpsc::UnboundedSender<QueuedFrame>,
}

impl ChannelQueue {
    /// Create a queue and the receiver a transmit task drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<QueuedFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TransmitQueue for ChannelQueue {
    fn enqueue(&self, channel: usize, priority: Priority, packet: Packet) {
        let frame = QueuedFrame {
            channel,
            priority,
            packet,
        };
        if self.tx.send(frame).is_err() {
            tracing::warn!("Transmit queue closed, dropping frame for channel {}", channel);
        }
    }
}

/// [`ServerLink`] backed by an unbounded tokio channel
///
/// Starts connected. Marked disconnected by the owner of the socket, or
/// automatically once the receiving end goes away.
#[derive(Debug)]
pub struct ChannelServerLink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    connected: AtomicBool,
}

impl ChannelServerLink {
    /// Create a link and the receiver a socket writer drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = Self {
            tx,
            connected: AtomicBool::new(true),
        };
        (link, rx)
    }

    /// Record a login or a disconnect
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }
}

impl ServerLink for ChannelServerLink {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    fn send_line(&self, line: &[u8]) {
        if self.tx.send(line.to_vec()).is_err() {
            tracing::warn!("APRS-IS link closed, line not sent");
            self.set_connected(false);
        }
    }
}
