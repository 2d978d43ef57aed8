//! Error types for the HOPGATE core.

use thiserror::Error;

/// Errors produced while parsing or rewriting packets
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// No `:` separating the address header from the information part
    #[error("missing ':' between address header and information part")]
    MissingInfoSeparator,

    /// No `>` after the source address
    #[error("missing source address")]
    MissingSource,

    /// No destination address after `>`
    #[error("missing destination address")]
    MissingDestination,

    /// Address token could not be parsed
    #[error("invalid address \"{address}\": {reason}")]
    InvalidAddress {
        /// The offending token
        address: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Third-party unwrap requested on a packet that is not third-party
    #[error("not a third-party packet")]
    NotThirdParty,

    /// Repeater index out of range
    #[error("repeater index {index} out of range (count {count})")]
    RepeaterIndex {
        /// Requested index
        index: usize,
        /// Current repeater count
        count: usize,
    },

    /// Via path already holds the maximum number of repeaters
    #[error("via path is full ({max} repeaters)", max = crate::MAX_REPEATERS)]
    TooManyRepeaters,
}

/// Errors raised while evaluating an address pattern
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The matcher failed to run against a token
    #[error("matcher failed on \"{token}\": {reason}")]
    Execution {
        /// Token being classified
        token: String,
        /// Matcher-specific reason
        reason: String,
    },
}

/// Configuration errors, reported before the core starts
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Regular expression failed to compile
    #[error("invalid {kind} pattern \"{pattern}\": {source}")]
    InvalidPattern {
        /// "alias" or "wide"
        kind: &'static str,
        /// Pattern text
        pattern: String,
        /// Compiler error
        #[source]
        source: regex::Error,
    },

    /// Channel number outside the configured set
    #[error("channel {channel} out of range (have {count} channels)")]
    ChannelOutOfRange {
        /// Offending channel
        channel: usize,
        /// Number of configured channels
        count: usize,
    },

    /// No radio channels configured
    #[error("at least one radio channel is required")]
    NoChannels,

    /// Station callsign or via path did not parse
    #[error("invalid station address: {0}")]
    InvalidAddress(#[from] PacketError),

    /// A numeric setting is outside its accepted range
    #[error("{name} = {value} is out of range ({min}..={max})")]
    OutOfRange {
        /// Setting name
        name: &'static str,
        /// Supplied value
        value: u64,
        /// Minimum accepted value
        min: u64,
        /// Maximum accepted value
        max: u64,
    },

    /// Too many via hops in the IGate transmit path
    #[error("transmit via path has {0} hops (max {max})", max = crate::MAX_REPEATERS)]
    ViaPathTooLong(usize),
}
