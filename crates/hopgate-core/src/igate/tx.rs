//! APRS-IS to RF.
//!
//! ```text
//! server:  W1XYZ>APRS,TCPIP*,qAC,T2BOS:>hello
//! RF:      N0CALL>APHG01,WIDE1-1:}W1XYZ>APRS,TCPIP,N0CALL*:>hello
//! ```

use super::{Igate, IgateCounters};
use crate::error::PacketError;
use crate::packet::{Address, AddressMode, Fingerprint, Packet};
use crate::queue::Priority;
use crate::{VERSION_MAJOR, VERSION_MINOR};
use serde::Serialize;
use std::time::{Duration, Instant};

const ONE_MINUTE: Duration = Duration::from_secs(60);
const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);

/// Why a server line was not transmitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum TxDrop {
    /// Line did not parse as a packet
    Malformed(String),
    /// Transmitted recently
    Duplicate,
    /// One-minute limit reached
    MinuteLimit(u32),
    /// Five-minute limit reached
    FiveMinuteLimit(u32),
}

/// Outcome of [`Igate::xmit_line`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxVerdict {
    /// Third-party packet queued on the transmit channel
    Transmitted {
        /// Radio channel
        channel: usize,
        /// Monitor-format text of the queued packet
        frame: String,
    },
    /// No transmit channel configured
    Disabled,
    /// Not transmitted
    Dropped(TxDrop),
}

/// Destination of third-party packets we originate
pub fn tocall() -> Address {
    Address::new_unchecked(&format!("APHG{VERSION_MAJOR}{VERSION_MINOR}"), 0)
}

impl Igate {
    /// Consider one line from the server for transmission on RF
    pub fn xmit_line(&self, line: &[u8]) -> TxVerdict {
        self.xmit_line_at(line, Instant::now())
    }

    /// [`Igate::xmit_line`] with an explicit clock
    pub fn xmit_line_at(&self, line: &[u8], now: Instant) -> TxVerdict {
        let Some(channel) = self.config.tx_channel else {
            return TxVerdict::Disabled;
        };
        let Some(mycall) = self.mycalls.get(channel) else {
            return TxVerdict::Disabled;
        };
        IgateCounters::bump(&self.stats.tx_candidates);

        let packet = match rewrite_for_rf(line, mycall) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(
                    "Tx IGate: could not parse message from server: {}: {}",
                    e,
                    String::from_utf8_lossy(line)
                );
                return self.tx_drop(TxDrop::Malformed(e.to_string()));
            }
        };

        let fingerprint = packet.fingerprint();
        let decision = self.tx_history.decision_lock();
        if let Some(reason) = self.admit(fingerprint, now) {
            return self.tx_drop(reason);
        }

        let frame = match Packet::third_party(
            mycall.clone(),
            tocall(),
            self.config.tx_via.clone(),
            &packet.to_monitor_bytes(),
        ) {
            Ok(frame) => frame,
            Err(e) => return self.tx_drop(TxDrop::Malformed(e.to_string())),
        };

        self.tx_history.remember_at(fingerprint, now);
        drop(decision);

        let text = frame.to_string();
        tracing::info!("[ig>tx] {}", text);
        self.queue.enqueue(channel, Priority::Low, frame);
        IgateCounters::bump(&self.stats.transmitted);

        TxVerdict::Transmitted {
            channel,
            frame: text,
        }
    }

    /// Duplicate check first, then the two rate limits
    fn admit(&self, fingerprint: Fingerprint, now: Instant) -> Option<TxDrop> {
        if self.tx_history.contains_at(fingerprint, now) {
            tracing::info!("Tx IGate: drop duplicate packet transmitted recently");
            return Some(TxDrop::Duplicate);
        }

        let limit_1 = self.config.tx_limit_1;
        if self.tx_history.count_within(ONE_MINUTE, now) >= limit_1 as usize {
            tracing::warn!(
                "Tx IGate: rate limit of {} packets in one minute exceeded",
                limit_1
            );
            return Some(TxDrop::MinuteLimit(limit_1));
        }

        let limit_5 = self.config.tx_limit_5;
        if self.tx_history.count_within(FIVE_MINUTES, now) >= limit_5 as usize {
            tracing::warn!(
                "Tx IGate: rate limit of {} packets in five minutes exceeded",
                limit_5
            );
            return Some(TxDrop::FiveMinuteLimit(limit_5));
        }

        None
    }

    fn tx_drop(&self, reason: TxDrop) -> TxVerdict {
        IgateCounters::bump(&self.stats.tx_dropped);
        TxVerdict::Dropped(reason)
    }
}

/// Replace the internet path with `TCPIP,<mycall>*`
fn rewrite_for_rf(line: &[u8], mycall: &Address) -> Result<Packet, PacketError> {
    let mut packet = Packet::from_bytes(line, AddressMode::Relaxed)?;
    packet.set_repeaters(vec![
        Address::new_unchecked("TCPIP", 0).as_used(),
        mycall.as_used(),
    ])?;
    Ok(packet)
}
