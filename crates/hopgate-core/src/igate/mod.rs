//! Internet gateway (IGate)
//!
//! Two independent directions:
//!
//! - **rx**: packets heard on RF are forwarded to APRS-IS with a `qAR`
//!   construct naming the receiving station ([`Igate::send_rec_packet`]).
//! - **tx**: lines from APRS-IS are wrapped as third-party packets and
//!   queued for RF, subject to duplicate suppression and rate limits
//!   ([`Igate::xmit_line`]).
//!
//! Each direction keeps its own duplicate ring. The tx ring doubles as the
//! record used for the one- and five-minute transmit limits.

mod reader;
mod rx;
mod tx;

pub use reader::{MAX_SERVER_LINE, read_server_lines};
pub use rx::{LOOP_TOKENS, Q_CONSTRUCT_RF, RxDrop, RxVerdict};
pub use tx::{TxDrop, TxVerdict, tocall};

use crate::config::IgateConfig;
use crate::dedupe::{DedupeCache, RX_GATE_HISTORY, TX_GATE_HISTORY};
use crate::error::ConfigError;
use crate::packet::Address;
use crate::queue::{ServerLink, TransmitQueue};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Duplicate window, RF to APRS-IS
pub const RX_GATE_DEDUPE_TIME: Duration = Duration::from_secs(60);

/// Duplicate window, APRS-IS to RF
pub const TX_GATE_DEDUPE_TIME: Duration = Duration::from_secs(60);

/// IGate for one APRS-IS connection
pub struct Igate {
    config: IgateConfig,
    mycalls: Vec<Address>,
    server: Arc<dyn ServerLink>,
    queue: Arc<dyn TransmitQueue>,
    rx_history: DedupeCache,
    tx_history: DedupeCache,
    stats: IgateCounters,
}

impl Igate {
    /// Create an IGate; `mycalls[n]` is our call on radio channel n
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` does not validate against the
    /// number of channels.
    pub fn new(
        config: IgateConfig,
        mycalls: Vec<Address>,
        server: Arc<dyn ServerLink>,
        queue: Arc<dyn TransmitQueue>,
    ) -> Result<Self, ConfigError> {
        if mycalls.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        config.validate(mycalls.len())?;

        match config.tx_channel {
            Some(channel) => tracing::info!(
                "IGate: transmit to RF on channel {} as {}, limits {}/min {}/5min",
                channel,
                mycalls[channel],
                config.tx_limit_1,
                config.tx_limit_5
            ),
            None => tracing::info!("IGate: receive only"),
        }

        Ok(Self {
            config,
            mycalls,
            server,
            queue,
            rx_history: DedupeCache::new(RX_GATE_HISTORY, RX_GATE_DEDUPE_TIME),
            tx_history: DedupeCache::new(TX_GATE_HISTORY, TX_GATE_DEDUPE_TIME),
            stats: IgateCounters::default(),
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &IgateConfig {
        &self.config
    }

    /// RF to APRS-IS duplicate ring
    pub fn rx_history(&self) -> &DedupeCache {
        &self.rx_history
    }

    /// APRS-IS to RF duplicate ring
    pub fn tx_history(&self) -> &DedupeCache {
        &self.tx_history
    }

    /// Get IGate statistics
    pub fn stats(&self) -> IgateStats {
        self.stats.snapshot()
    }
}

#[derive(Debug, Default)]
struct IgateCounters {
    rf_received: AtomicU64,
    forwarded_to_server: AtomicU64,
    rx_dropped: AtomicU64,
    server_lines: AtomicU64,
    server_bytes: AtomicU64,
    tx_candidates: AtomicU64,
    transmitted: AtomicU64,
    tx_dropped: AtomicU64,
}

impl IgateCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn add(counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    fn snapshot(&self) -> IgateStats {
        IgateStats {
            rf_received: self.rf_received.load(Ordering::Relaxed),
            forwarded_to_server: self.forwarded_to_server.load(Ordering::Relaxed),
            rx_dropped: self.rx_dropped.load(Ordering::Relaxed),
            server_lines: self.server_lines.load(Ordering::Relaxed),
            server_bytes: self.server_bytes.load(Ordering::Relaxed),
            tx_candidates: self.tx_candidates.load(Ordering::Relaxed),
            transmitted: self.transmitted.load(Ordering::Relaxed),
            tx_dropped: self.tx_dropped.load(Ordering::Relaxed),
        }
    }
}

/// IGate statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IgateStats {
    /// RF packets offered while connected
    pub rf_received: u64,

    /// RF packets sent to the server
    pub forwarded_to_server: u64,

    /// RF packets not sent to the server
    pub rx_dropped: u64,

    /// Lines read from the server, comments included
    pub server_lines: u64,

    /// Bytes read from the server
    pub server_bytes: u64,

    /// Server packets considered for RF
    pub tx_candidates: u64,

    /// Server packets queued for RF
    pub transmitted: u64,

    /// Server packets not queued for RF
    pub tx_dropped: u64,
}
