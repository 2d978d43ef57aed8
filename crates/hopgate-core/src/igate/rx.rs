//! RF to APRS-IS.

use super::{Igate, IgateCounters};
use crate::packet::{Packet, QUERY_DTI};
use serde::Serialize;
use std::time::Instant;

/// Via tokens that mark a packet as not for the internet
pub const LOOP_TOKENS: [&str; 4] = ["TCPIP", "TCPXX", "RFONLY", "NOGATE"];

/// q construct added to packets heard directly on RF
pub const Q_CONSTRUCT_RF: &str = "qAR";

/// Why a received packet was not sent to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RxDrop {
    /// No server connection
    NotConnected,
    /// Channel has no station call configured
    UnknownChannel,
    /// Path carries a do-not-gate token
    LoopToken(String),
    /// Third-party payload did not parse
    BadThirdParty(String),
    /// APRS query
    Query,
    /// Nothing left after cutting at CR or LF
    EmptyInfo,
    /// Sent recently
    Duplicate,
}

/// Outcome of [`Igate::send_rec_packet`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RxVerdict {
    /// Line sent to the server, CR LF included (lossy UTF-8)
    Forwarded(String),
    /// Not sent
    Dropped(RxDrop),
}

impl Igate {
    /// Offer a packet heard on radio `channel` to APRS-IS
    pub fn send_rec_packet(&self, channel: usize, received: &Packet) -> RxVerdict {
        self.send_rec_packet_at(channel, received, Instant::now())
    }

    /// [`Igate::send_rec_packet`] with an explicit clock
    pub fn send_rec_packet_at(&self, channel: usize, received: &Packet, now: Instant) -> RxVerdict {
        if !self.server.is_connected() {
            return RxVerdict::Dropped(RxDrop::NotConnected);
        }
        IgateCounters::bump(&self.stats.rf_received);

        let decision = self.rx_history.decision_lock();
        match self.prepare_uplink(channel, received, now) {
            Ok((packet, line)) => {
                self.rx_history.remember_at(packet.fingerprint(), now);
                drop(decision);
                self.server.send_line(&line);
                IgateCounters::bump(&self.stats.forwarded_to_server);
                let line = String::from_utf8_lossy(&line).into_owned();
                tracing::debug!("[rx>ig] {}", line.trim_end());
                RxVerdict::Forwarded(line)
            }
            Err(reason) => {
                IgateCounters::bump(&self.stats.rx_dropped);
                RxVerdict::Dropped(reason)
            }
        }
    }

    fn prepare_uplink(
        &self,
        channel: usize,
        received: &Packet,
        now: Instant,
    ) -> Result<(Packet, Vec<u8>), RxDrop> {
        let Some(mycall) = self.mycalls.get(channel) else {
            tracing::warn!("Rx IGate: no station call for channel {}", channel);
            return Err(RxDrop::UnknownChannel);
        };

        let mut packet = unwrap_for_gateway(received)?;

        if packet.data_type() == Some(QUERY_DTI) {
            tracing::debug!("Rx IGate: do not relay query from {}", packet.source());
            return Err(RxDrop::Query);
        }

        if let Some(end) = packet.info().iter().position(|&b| b == b'\r' || b == b'\n') {
            packet.truncate_info(end);
        }
        if packet.info().is_empty() {
            tracing::debug!("Rx IGate: empty information part from {}", packet.source());
            return Err(RxDrop::EmptyInfo);
        }

        if self.rx_history.contains_at(packet.fingerprint(), now) {
            tracing::debug!("Rx IGate: drop duplicate of same packet seen recently");
            return Err(RxDrop::Duplicate);
        }

        let mut line =
            format!("{},{},{}:", packet.format_path(), Q_CONSTRUCT_RF, mycall).into_bytes();
        line.extend_from_slice(packet.info());
        line.extend_from_slice(b"\r\n");
        Ok((packet, line))
    }
}

/// Strip third-party wrappers, refusing anything marked do-not-gate
fn unwrap_for_gateway(received: &Packet) -> Result<Packet, RxDrop> {
    let mut packet = received.clone();
    while packet.is_third_party() {
        check_loop_tokens(&packet)?;
        packet = packet.unwrap_third_party().map_err(|e| {
            tracing::debug!(
                "Rx IGate: third-party payload from {} did not parse: {}",
                packet.source(),
                e
            );
            RxDrop::BadThirdParty(e.to_string())
        })?;
    }
    check_loop_tokens(&packet)?;
    Ok(packet)
}

fn check_loop_tokens(packet: &Packet) -> Result<(), RxDrop> {
    let hit = packet
        .repeaters()
        .iter()
        .map(ToString::to_string)
        .find(|via| LOOP_TOKENS.contains(&via.as_str()));
    match hit {
        Some(token) => {
            tracing::debug!("Rx IGate: {} in path of {}, not gated", token, packet.source());
            Err(RxDrop::LoopToken(token))
        }
        None => Ok(()),
    }
}
