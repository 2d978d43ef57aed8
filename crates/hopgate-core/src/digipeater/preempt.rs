//! Preemptive digipeating.
//!
//! When the next hop is not for us but a later unused hop is, the station
//! may jump ahead and act for that later hop. The mode decides what happens
//! to the hops it skipped:
//!
//! ```text
//! in:    CITYA*,CITYB,CITYC,CITYD,CITYE     (we answer to CITYD)
//! DROP:  WB2OSZ-9*,CITYE
//! MARK:  CITYA,CITYB,CITYC,WB2OSZ-9*,CITYE
//! TRACE: CITYA,WB2OSZ-9*,CITYE
//! ```

use crate::packet::{Address, Packet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Preemptive digipeating behavior for a channel pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreemptMode {
    /// Only the first unused hop is considered
    #[default]
    Off,
    /// Remove every hop ahead of the preempted one
    Drop,
    /// Mark skipped hops as used
    Mark,
    /// Remove skipped hops, keep the ones already repeated
    Trace,
}

impl PreemptMode {
    /// Whether later hops are searched at all
    pub fn is_enabled(self) -> bool {
        self != PreemptMode::Off
    }

    /// Tidy the path after our call was placed at `matched`
    ///
    /// Returns the index our call ends up at.
    pub(crate) fn clean_up(self, packet: &mut Packet, matched: usize) -> usize {
        // Skipped hops run from just after the last repeated hop up to `matched`.
        let skipped_from = packet
            .repeaters()
            .iter()
            .take(matched)
            .rposition(Address::is_used)
            .map_or(0, |i| i + 1);

        match self {
            PreemptMode::Off => matched,
            PreemptMode::Drop => {
                packet.remove_repeaters(0..matched);
                0
            }
            PreemptMode::Mark => {
                for index in skipped_from..matched {
                    if let Some(repeater) = packet.repeater_mut(index) {
                        repeater.mark_used();
                    }
                }
                matched
            }
            PreemptMode::Trace => {
                packet.remove_repeaters(skipped_from..matched);
                skipped_from
            }
        }
    }
}

impl fmt::Display for PreemptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PreemptMode::Off => "off",
            PreemptMode::Drop => "drop",
            PreemptMode::Mark => "mark",
            PreemptMode::Trace => "trace",
        })
    }
}

impl FromStr for PreemptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(PreemptMode::Off),
            "drop" => Ok(PreemptMode::Drop),
            "mark" => Ok(PreemptMode::Mark),
            "trace" => Ok(PreemptMode::Trace),
            other => Err(format!(
                "unknown preempt mode '{other}' (expected off, drop, mark or trace)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::AddressMode;

    /// Put our call at `matched` the way the engine does, then clean up.
    fn preempt(mode: PreemptMode, text: &str, matched: usize) -> (String, usize) {
        let mut packet = Packet::from_text(text, AddressMode::Strict).unwrap();
        let mycall: Address = "WB2OSZ-9".parse().unwrap();
        *packet.repeater_mut(matched).unwrap() = mycall.as_used();
        let index = mode.clean_up(&mut packet, matched);
        (packet.format_addrs(), index)
    }

    const PATH: &str = "W1ABC>TEST,CITYA*,CITYB,CITYC,CITYD,CITYE:x";

    #[test]
    fn test_drop_removes_everything_ahead() {
        assert_eq!(
            preempt(PreemptMode::Drop, PATH, 3),
            ("W1ABC>TEST,WB2OSZ-9*,CITYE:".to_string(), 0)
        );
    }

    #[test]
    fn test_mark_sets_skipped_used() {
        assert_eq!(
            preempt(PreemptMode::Mark, PATH, 3),
            ("W1ABC>TEST,CITYA,CITYB,CITYC,WB2OSZ-9*,CITYE:".to_string(), 3)
        );
    }

    #[test]
    fn test_trace_keeps_repeated_hops() {
        assert_eq!(
            preempt(PreemptMode::Trace, PATH, 3),
            ("W1ABC>TEST,CITYA,WB2OSZ-9*,CITYE:".to_string(), 1)
        );
        assert_eq!(
            preempt(PreemptMode::Trace, "W1ABC>TEST,CITYB,CITYC,CITYD:x", 2),
            ("W1ABC>TEST,WB2OSZ-9*:".to_string(), 0)
        );
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!("TRACE".parse::<PreemptMode>(), Ok(PreemptMode::Trace));
        assert_eq!("off".parse::<PreemptMode>(), Ok(PreemptMode::Off));
        assert!("sideways".parse::<PreemptMode>().is_err());
        assert_eq!(PreemptMode::Mark.to_string(), "mark");
    }
}
