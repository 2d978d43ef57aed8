//! Time-windowed duplicate suppression
//!
//! A fixed-size ring of `(timestamp, fingerprint)` entries. New entries
//! overwrite the oldest slot. Lookups treat an entry as live while
//! `now - timestamp <= window`.
//!
//! The same ring answers "how many packets were remembered in the last N
//! seconds", which the IGate uses for its transmit rate limits.

use crate::packet::Fingerprint;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Digipeater ring size, per target channel
pub const DIGIPEAT_HISTORY: usize = 25;

/// RF to APRS-IS ring size
pub const RX_GATE_HISTORY: usize = 30;

/// APRS-IS to RF ring size; large enough to count the highest five-minute
/// transmit limit
pub const TX_GATE_HISTORY: usize = crate::config::MAX_TX_LIMIT_5 as usize;

/// One remembered packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupeEntry {
    /// When the packet was remembered
    pub timestamp: Instant,
    /// Packet identity
    pub fingerprint: Fingerprint,
}

#[derive(Debug)]
struct Ring {
    slots: Vec<Option<DedupeEntry>>,
    insert_next: usize,
}

/// Bounded history of recently handled packets
///
/// # Thread Safety
///
/// Interior mutability through a `Mutex`; all methods take `&self` and are
/// safe to call from several receive threads.
#[derive(Debug)]
pub struct DedupeCache {
    window: Duration,
    ring: Mutex<Ring>,
    decision: Mutex<()>,
}

impl DedupeCache {
    /// Create an empty ring with `capacity` slots (at least one)
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            window,
            ring: Mutex::new(Ring {
                slots: vec![None; capacity.max(1)],
                insert_next: 0,
            }),
            decision: Mutex::new(()),
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    /// Remember a packet as handled now
    pub fn remember(&self, fingerprint: Fingerprint) {
        self.remember_at(fingerprint, Instant::now());
    }

    /// Remember a packet as handled at `now`
    pub fn remember_at(&self, fingerprint: Fingerprint, now: Instant) {
        let mut ring = self.lock();
        let index = ring.insert_next;
        ring.slots[index] = Some(DedupeEntry {
            timestamp: now,
            fingerprint,
        });
        ring.insert_next = (index + 1) % ring.slots.len();
    }

    /// Whether the packet was remembered within the window
    pub fn contains(&self, fingerprint: Fingerprint) -> bool {
        self.contains_at(fingerprint, Instant::now())
    }

    /// Whether the packet was remembered within the window ending at `now`
    pub fn contains_at(&self, fingerprint: Fingerprint, now: Instant) -> bool {
        self.lock().slots.iter().flatten().any(|entry| {
            entry.fingerprint == fingerprint && within(entry.timestamp, now, self.window)
        })
    }

    /// Number of entries remembered within `span` before `now`
    pub fn count_within(&self, span: Duration, now: Instant) -> usize {
        self.lock()
            .slots
            .iter()
            .flatten()
            .filter(|entry| within(entry.timestamp, now, span))
            .count()
    }

    /// Serialize a check followed by a remember
    ///
    /// Callers that decide on [`DedupeCache::contains_at`] and then
    /// [`DedupeCache::remember_at`] hold this guard across both, so two
    /// threads offering the same packet cannot both pass the check.
    pub fn decision_lock(&self) -> MutexGuard<'_, ()> {
        self.decision.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        // Entries are plain values; a poisoned ring is still consistent.
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn within(timestamp: Instant, now: Instant, span: Duration) -> bool {
    now.saturating_duration_since(timestamp) <= span
}
