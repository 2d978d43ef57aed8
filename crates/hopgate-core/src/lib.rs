//! # HOPGATE Core
//!
//! Decision layer for an APRS digipeater and Internet gateway (IGate).
//!
//! This crate provides:
//! - Packet model with monitor-format parsing and formatting
//! - Digipeater path rewriting (aliases, `WIDEn-N`, preemption)
//! - Cross-channel dispatch with per-channel duplicate suppression
//! - RF to APRS-IS gateway filtering (`qAR` construct)
//! - APRS-IS to RF gateway filtering with transmit rate limits
//!
//! Radio modems, the APRS-IS socket and transmit scheduling live outside
//! this crate; they are reached through the [`TransmitQueue`] and
//! [`ServerLink`] traits.
//!
//! ## Architecture
//!
//! ```text
//!   received on channel N                       line from APRS-IS
//!            │                                          │
//!            ▼                                          ▼
//! ┌──────────────────────┐   ┌────────────────┐  ┌──────────────────┐
//! │      Digipeater      │   │   Igate (rx)   │  │    Igate (tx)    │
//! │ same channel: high   │   │ loop tokens,   │  │ strip path, add  │
//! │ other channels: low  │   │ unwrap, qAR    │  │ TCPIP, rate cap  │
//! └──────────┬───────────┘   └───────┬────────┘  └────────┬─────────┘
//!            │  DedupeCache per       │  DedupeCache       │  DedupeCache
//!            │  target channel        │  (rx → IS)         │  (IS → tx)
//!            ▼                        ▼                    ▼
//!      TransmitQueue             ServerLink           TransmitQueue
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dedupe;
pub mod digipeater;
pub mod error;
pub mod igate;
pub mod packet;
pub mod pattern;
pub mod queue;

pub use config::{ChannelPairConfig, DigipeaterConfig, DigipeaterConfigBuilder, IgateConfig};
pub use dedupe::DedupeCache;
pub use digipeater::{Digipeater, DigipeaterStats, PreemptMode, Repeat, RepeatRule, digipeat_match};
pub use error::{ConfigError, PacketError, PatternError};
pub use igate::{Igate, IgateStats, RxDrop, RxVerdict, TxDrop, TxVerdict, read_server_lines};
pub use packet::{Address, AddressMode, Fingerprint, MAX_INFO_LEN, MAX_REPEATERS, Packet};
pub use pattern::{AddressMatcher, AddressPatterns, Classification};
pub use queue::{ChannelQueue, ChannelServerLink, Priority, QueuedFrame, ServerLink, TransmitQueue};

/// Software version, major digit, used in the IGate tocall
pub const VERSION_MAJOR: u8 = 0;

/// Software version, minor digit, used in the IGate tocall
pub const VERSION_MINOR: u8 = 1;
