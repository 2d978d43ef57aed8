//! Path rewriting for a single (from, to) channel pair.
//!
//! Rules are tried in order against the first unused repeater; the first
//! one that fires produces the packet to transmit:
//!
//! 1. Explicitly addressed to our receive call: substitute our transmit call.
//! 2. Seen recently on the target channel: drop.
//! 3. Alias match: substitute our transmit call.
//! 4. Preemption (if enabled): act for a later hop addressed to us.
//! 5. Wide match `CALLn-N`: N=1 is substituted, N=2..7 is decremented and
//!    our call is inserted in front when the path has room.
//!
//! Before any of that, a packet with an empty path and a non-zero
//! destination SSID gets the equivalent explicit path (legacy SSID
//! digipeating).

use super::preempt::PreemptMode;
use crate::dedupe::DedupeCache;
use crate::error::PacketError;
use crate::packet::{Address, Packet};
use crate::pattern::AddressPatterns;
use std::time::Instant;

/// Explicit path implied by a destination SSID when the via path is empty
///
/// Index 0 is never used. 1-7 are `WIDEn-n`; 8-15 were north/south/east/west
/// variants, now mapped to the nearest generic path.
pub const LEGACY_SSID_PATHS: [(&str, u8); 16] = [
    ("", 0),
    ("WIDE1", 1),
    ("WIDE2", 2),
    ("WIDE3", 3),
    ("WIDE4", 4),
    ("WIDE5", 5),
    ("WIDE6", 6),
    ("WIDE7", 7),
    ("WIDE1", 1),
    ("WIDE1", 1),
    ("WIDE1", 1),
    ("WIDE1", 1),
    ("WIDE2", 2),
    ("WIDE2", 2),
    ("WIDE2", 2),
    ("WIDE2", 2),
];

/// Everything the engine needs to decide for one (from, to) pair
#[derive(Debug, Clone, Copy)]
pub struct RepeatRule<'a> {
    /// Our call on the receiving channel
    pub receive_call: &'a Address,
    /// Our call on the transmitting channel
    pub transmit_call: &'a Address,
    /// Alias and wide patterns of the pair
    pub patterns: &'a AddressPatterns,
    /// Preemption mode of the pair
    pub preempt: PreemptMode,
    /// Recently transmitted packets on the target channel
    pub history: &'a DedupeCache,
}

/// Decide whether `packet` should be repeated under `rule`
///
/// Returns the rewritten packet, or `None` when it should not be repeated.
/// The input may be modified by legacy SSID expansion; the returned packet
/// is always a separate copy.
pub fn digipeat_match(packet: &mut Packet, rule: &RepeatRule<'_>, now: Instant) -> Option<Packet> {
    expand_destination_ssid(packet);

    let index = packet.first_unused_repeater()?;
    let repeater = packet.repeater(index)?.clone();
    let token = repeater.to_string();

    if repeater.same_station(rule.receive_call) {
        return Some(substitute(packet, index, rule.transmit_call));
    }

    if rule.history.contains_at(packet.fingerprint(), now) {
        tracing::debug!(
            "Digipeater: drop redundant packet from {} to {}",
            packet.source(),
            rule.transmit_call
        );
        return None;
    }

    if rule.patterns.is_alias(&token) {
        return Some(substitute(packet, index, rule.transmit_call));
    }

    if rule.preempt.is_enabled() {
        if let Some(result) = preempt(packet, index, rule) {
            return Some(result);
        }
    }

    if rule.patterns.is_wide(&token) {
        match repeater.ssid() {
            1 => return Some(substitute(packet, index, rule.transmit_call)),
            remaining @ 2..=7 => {
                let mut result = packet.clone();
                result.repeater_mut(index)?.set_ssid(remaining - 1);
                match result.insert_repeater(index, rule.transmit_call.as_used()) {
                    Ok(()) => {}
                    Err(PacketError::TooManyRepeaters) => tracing::debug!(
                        "Digipeater: path full, {} decremented without adding {}",
                        token,
                        rule.transmit_call
                    ),
                    Err(e) => tracing::warn!("Digipeater: could not insert own call: {}", e),
                }
                return Some(result);
            }
            _ => {}
        }
    }

    None
}

/// Copy of `packet` with our call, marked used, in slot `index`
fn substitute(packet: &Packet, index: usize, call: &Address) -> Packet {
    let mut result = packet.clone();
    if let Some(slot) = result.repeater_mut(index) {
        *slot = call.as_used();
    }
    result
}

fn preempt(packet: &Packet, first_unused: usize, rule: &RepeatRule<'_>) -> Option<Packet> {
    let matched = packet
        .repeaters()
        .iter()
        .enumerate()
        .skip(first_unused + 1)
        .filter(|(_, r)| !r.is_used())
        .find(|(_, r)| r.same_station(rule.receive_call) || rule.patterns.is_alias(&r.to_string()))
        .map(|(i, _)| i)?;

    let mut result = substitute(packet, matched, rule.transmit_call);
    rule.preempt.clean_up(&mut result, matched);
    Some(result)
}

fn expand_destination_ssid(packet: &mut Packet) {
    let ssid = packet.destination().ssid();
    if ssid == 0 || packet.repeater_count() > 0 {
        return;
    }
    let Some(&(call, hops)) = LEGACY_SSID_PATHS.get(usize::from(ssid)) else {
        return;
    };
    if packet.push_repeater(Address::new_unchecked(call, hops)).is_ok() {
        packet.destination_mut().set_ssid(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::AddressMode;
    use std::time::Duration;

    const ALIAS: &str = r"^WIDE[4-7]-[1-7]|CITYD$";
    const WIDE: &str = r"^WIDE[1-7]-[1-7]$|^TRACE[1-7]-[1-7]$|^MA[1-7]-[1-7]$";

    struct Fixture {
        mycall: Address,
        patterns: AddressPatterns,
        history: DedupeCache,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                mycall: "WB2OSZ-9".parse().unwrap(),
                patterns: AddressPatterns::compile(ALIAS, WIDE).unwrap(),
                history: DedupeCache::new(25, Duration::from_secs(4)),
            }
        }

        fn run(&self, preempt: PreemptMode, text: &str) -> Option<String> {
            let rule = RepeatRule {
                receive_call: &self.mycall,
                transmit_call: &self.mycall,
                patterns: &self.patterns,
                preempt,
                history: &self.history,
            };
            let mut packet = Packet::from_text(text, AddressMode::Strict).unwrap();
            digipeat_match(&mut packet, &rule, Instant::now()).map(|p| p.to_string())
        }
    }

    #[test]
    fn test_wide_decrement_inserts_own_call() {
        let f = Fixture::new();
        assert_eq!(
            f.run(PreemptMode::Off, "W1ABC>TEST,TRACE3-3:"),
            Some("W1ABC>TEST,WB2OSZ-9*,TRACE3-2:".to_string())
        );
    }

    #[test]
    fn test_wide_last_hop_substituted() {
        let f = Fixture::new();
        assert_eq!(
            f.run(PreemptMode::Off, "W1ABC>TEST,WIDE3-1:"),
            Some("W1ABC>TEST,WB2OSZ-9*:".to_string())
        );
    }

    #[test]
    fn test_full_path_decrements_without_insert() {
        let f = Fixture::new();
        assert_eq!(
            f.run(PreemptMode::Off, "W1ABC>TEST,R1,R2,R3,R4,R5,R6*,WIDE3-3:"),
            Some("W1ABC>TEST,R1,R2,R3,R4,R5,R6,WB2OSZ-9*,WIDE3-2:".to_string())
        );
        assert_eq!(
            f.run(PreemptMode::Off, "W1ABC>TEST,R1,R2,R3,R4,R5,R6,R7*,WIDE3-3:"),
            Some("W1ABC>TEST,R1,R2,R3,R4,R5,R6,R7*,WIDE3-2:".to_string())
        );
    }

    #[test]
    fn test_alias_takes_precedence() {
        let f = Fixture::new();
        assert_eq!(
            f.run(PreemptMode::Off, "W1ABC>TEST,WIDE4-4:"),
            Some("W1ABC>TEST,WB2OSZ-9*:".to_string())
        );
    }

    #[test]
    fn test_out_of_range_wide_tokens_ignored() {
        let f = Fixture::new();
        assert_eq!(f.run(PreemptMode::Off, "W1ABC>TEST,WIDE0-4:"), None);
        assert_eq!(f.run(PreemptMode::Off, "W1ABC>TEST,WIDE8-4:"), None);
        assert_eq!(f.run(PreemptMode::Off, "W1ABC>TEST,WIDE2:"), None);
    }

    #[test]
    fn test_explicit_call_ignores_history() {
        let f = Fixture::new();
        let text = "W1ABC>TEST,WB2OSZ-9,WIDE2-1:x";
        let first = f.run(PreemptMode::Off, text).unwrap();
        let packet = Packet::from_text(&first, AddressMode::Strict).unwrap();
        f.history.remember(packet.fingerprint());
        assert_eq!(
            f.run(PreemptMode::Off, text),
            Some("W1ABC>TEST,WB2OSZ-9*,WIDE2-1:x".to_string())
        );
        // Same fingerprint through an alias is suppressed.
        assert_eq!(f.run(PreemptMode::Off, "W1ABC>TEST,WIDE2-1:x"), None);
    }

    #[test]
    fn test_legacy_destination_ssid() {
        let f = Fixture::new();
        assert_eq!(
            f.run(PreemptMode::Off, "W1ABC>TEST-3:"),
            Some("W1ABC>TEST,WB2OSZ-9*,WIDE3-2:".to_string())
        );
        // Ignored once a via path exists.
        assert_eq!(
            f.run(PreemptMode::Off, "W1DEF>TEST-3,WIDE2-2:"),
            Some("W1DEF>TEST-3,WB2OSZ-9*,WIDE2-1:".to_string())
        );
    }

    #[test]
    fn test_legacy_table() {
        assert_eq!(LEGACY_SSID_PATHS[7], ("WIDE7", 7));
        assert!(LEGACY_SSID_PATHS[8..12].iter().all(|&e| e == ("WIDE1", 1)));
        assert!(LEGACY_SSID_PATHS[12..].iter().all(|&e| e == ("WIDE2", 2)));
    }

    #[test]
    fn test_preempt_modes() {
        let f = Fixture::new();
        let text = "W1ABC>TEST,CITYA*,CITYB,CITYC,CITYD,CITYE:";
        assert_eq!(f.run(PreemptMode::Off, text), None);
        assert_eq!(
            f.run(PreemptMode::Drop, text),
            Some("W1ABC>TEST,WB2OSZ-9*,CITYE:".to_string())
        );
        assert_eq!(
            f.run(PreemptMode::Mark, text),
            Some("W1ABC>TEST,CITYA,CITYB,CITYC,WB2OSZ-9*,CITYE:".to_string())
        );
        assert_eq!(
            f.run(PreemptMode::Trace, text),
            Some("W1ABC>TEST,CITYA,WB2OSZ-9*,CITYE:".to_string())
        );
    }

    #[test]
    fn test_preempt_no_later_match() {
        let f = Fixture::new();
        assert_eq!(
            f.run(PreemptMode::Trace, "W1ABC>TEST,CITYA*,CITYB,CITYC,CITYX,CITYE:"),
            None
        );
    }

    #[test]
    fn test_fully_used_path() {
        let f = Fixture::new();
        assert_eq!(f.run(PreemptMode::Off, "W1ABC>TEST,WIDE1-1*:"), None);
    }

    #[test]
    fn test_input_unchanged_apart_from_legacy_expansion() {
        let f = Fixture::new();
        let rule = RepeatRule {
            receive_call: &f.mycall,
            transmit_call: &f.mycall,
            patterns: &f.patterns,
            preempt: PreemptMode::Off,
            history: &f.history,
        };
        let mut packet = Packet::from_text("W1ABC>TEST,WIDE2-2:x", AddressMode::Strict).unwrap();
        let before = packet.clone();
        assert!(digipeat_match(&mut packet, &rule, Instant::now()).is_some());
        assert_eq!(packet, before);
    }
}
