//! Digipeater dispatch
//!
//! Takes a packet received on one channel and offers it to every enabled
//! (from, to) channel pair. Same-channel repeats go out at high priority;
//! cross-channel repeats follow at low priority.
//!
//! ```text
//!            received on channel 0
//!                     │
//!        ┌────────────┴─────────────┐
//!        ▼                          ▼
//! ┌──────────────┐         ┌─────────────────┐
//! │ pair (0, 0)  │         │ pair (0, 1..n)  │
//! │ High         │         │ Low             │
//! └──────┬───────┘         └────────┬────────┘
//!        │ digipeat_match           │ digipeat_match
//!        ▼                          ▼
//!  remember in ring[0]       remember in ring[to]
//!        │                          │
//!        └──────────┬───────────────┘
//!                   ▼
//!             TransmitQueue
//! ```

mod matcher;
mod preempt;

pub use matcher::{LEGACY_SSID_PATHS, RepeatRule, digipeat_match};
pub use preempt::PreemptMode;

use crate::config::DigipeaterConfig;
use crate::dedupe::{DIGIPEAT_HISTORY, DedupeCache};
use crate::packet::Packet;
use crate::queue::{Priority, TransmitQueue};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// One repeat that was queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Repeat {
    /// Target channel
    pub channel: usize,
    /// Queue priority
    pub priority: Priority,
}

/// Digipeater for all configured channels
///
/// Holds one duplicate-suppression ring per target channel. Every method
/// takes `&self`, so receive threads for different channels can share one
/// instance.
pub struct Digipeater {
    config: Arc<DigipeaterConfig>,
    history: Vec<DedupeCache>,
    queue: Arc<dyn TransmitQueue>,

    /// Statistics: packets offered
    packets_received: AtomicU64,

    /// Statistics: repeats queued, all channels
    packets_repeated: AtomicU64,

    /// Statistics: repeats queued on the receiving channel
    same_channel: AtomicU64,

    /// Statistics: repeats queued on another channel
    cross_channel: AtomicU64,
}

impl Digipeater {
    /// Create a digipeater that queues repeats on `queue`
    pub fn new(config: Arc<DigipeaterConfig>, queue: Arc<dyn TransmitQueue>) -> Self {
        let history = (0..config.channel_count())
            .map(|_| DedupeCache::new(DIGIPEAT_HISTORY, config.dedupe_time()))
            .collect();

        tracing::debug!(
            "Digipeater: {} channels, dedupe window {:?}",
            config.channel_count(),
            config.dedupe_time()
        );

        Self {
            config,
            history,
            queue,
            packets_received: AtomicU64::new(0),
            packets_repeated: AtomicU64::new(0),
            same_channel: AtomicU64::new(0),
            cross_channel: AtomicU64::new(0),
        }
    }

    /// Offer a packet received on channel `from`
    ///
    /// Returns the repeats queued, in queue order. The packet may gain an
    /// explicit path from its destination SSID (see
    /// [`LEGACY_SSID_PATHS`]).
    pub fn digipeat(&self, from: usize, packet: &mut Packet) -> Vec<Repeat> {
        self.digipeat_at(from, packet, Instant::now())
    }

    /// [`Digipeater::digipeat`] with an explicit clock
    pub fn digipeat_at(&self, from: usize, packet: &mut Packet, now: Instant) -> Vec<Repeat> {
        let channels = self.config.channel_count();
        if from >= channels {
            tracing::warn!(
                "Digipeater: packet from channel {} ignored, only {} configured",
                from,
                channels
            );
            return Vec::new();
        }
        self.packets_received.fetch_add(1, Ordering::Relaxed);

        let mut repeats = Vec::new();

        self.try_repeat(from, from, Priority::High, packet, now, &mut repeats);
        for to in (0..channels).filter(|&to| to != from) {
            self.try_repeat(from, to, Priority::Low, packet, now, &mut repeats);
        }

        repeats
    }

    fn try_repeat(
        &self,
        from: usize,
        to: usize,
        priority: Priority,
        packet: &mut Packet,
        now: Instant,
        repeats: &mut Vec<Repeat>,
    ) {
        let Some(pair) = self.config.pair(from, to).filter(|pair| pair.enabled) else {
            return;
        };
        let (Some(receive_call), Some(transmit_call), Some(history)) = (
            self.config.mycall(from),
            self.config.mycall(to),
            self.history.get(to),
        ) else {
            return;
        };

        let rule = RepeatRule {
            receive_call,
            transmit_call,
            patterns: &pair.patterns,
            preempt: pair.preempt,
            history,
        };

        let decision = history.decision_lock();
        let Some(result) = digipeat_match(packet, &rule, now) else {
            return;
        };

        tracing::debug!("Digipeater: [{}>{}] {}", from, to, result);

        // Remember before queueing so a copy heard back during transmit is a duplicate.
        history.remember_at(result.fingerprint(), now);
        drop(decision);
        self.queue.enqueue(to, priority, result);

        self.packets_repeated.fetch_add(1, Ordering::Relaxed);
        if from == to {
            self.same_channel.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cross_channel.fetch_add(1, Ordering::Relaxed);
        }
        repeats.push(Repeat {
            channel: to,
            priority,
        });
    }

    /// Duplicate-suppression ring for target `channel`
    pub fn history(&self, channel: usize) -> Option<&DedupeCache> {
        self.history.get(channel)
    }

    /// Configuration in use
    pub fn config(&self) -> &DigipeaterConfig {
        &self.config
    }

    /// Get digipeater statistics
    pub fn stats(&self) -> DigipeaterStats {
        DigipeaterStats {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_repeated: self.packets_repeated.load(Ordering::Relaxed),
            same_channel: self.same_channel.load(Ordering::Relaxed),
            cross_channel: self.cross_channel.load(Ordering::Relaxed),
        }
    }
}

/// Digipeater statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DigipeaterStats {
    /// Packets offered to the digipeater
    pub packets_received: u64,

    /// Repeats queued, all channels
    pub packets_repeated: u64,

    /// Repeats queued on the receiving channel
    pub same_channel: u64,

    /// Repeats queued on another channel
    pub cross_channel: u64,
}
