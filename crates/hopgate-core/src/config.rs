//! Runtime configuration for the digipeater and the IGate.
//!
//! These are the validated, compiled forms. Loading from a file is the
//! job of the application layer.

use crate::digipeater::PreemptMode;
use crate::error::ConfigError;
use crate::packet::{Address, AddressMode, MAX_REPEATERS};
use crate::pattern::AddressPatterns;
use std::time::Duration;

/// Default digipeater duplicate window
pub const DEFAULT_DEDUPE_TIME: Duration = Duration::from_secs(30);

/// Digipeater duplicate windows must be shorter than this many seconds
pub const MAX_DEDUPE_SECS: u64 = 600;

/// Default limit of packets gated to RF in one minute
pub const DEFAULT_TX_LIMIT_1: u32 = 6;

/// Default limit of packets gated to RF in five minutes
pub const DEFAULT_TX_LIMIT_5: u32 = 20;

/// Upper bound for the one-minute limit
pub const MAX_TX_LIMIT_1: u32 = 20;

/// Upper bound for the five-minute limit
pub const MAX_TX_LIMIT_5: u32 = 100;

/// Settings for one (from, to) channel pair
#[derive(Debug)]
pub struct ChannelPairConfig {
    /// Alias and wide patterns
    pub patterns: AddressPatterns,
    /// Preemption mode
    pub preempt: PreemptMode,
    /// Whether the pair repeats at all
    pub enabled: bool,
}

impl ChannelPairConfig {
    /// Enabled pair with the given patterns
    pub fn new(patterns: AddressPatterns, preempt: PreemptMode) -> Self {
        Self {
            patterns,
            preempt,
            enabled: true,
        }
    }
}

/// Digipeater configuration for every channel
#[derive(Debug)]
pub struct DigipeaterConfig {
    mycalls: Vec<Address>,
    dedupe_time: Duration,
    /// `channel_count * channel_count`, row-major by `from`
    pairs: Vec<Option<ChannelPairConfig>>,
}

impl DigipeaterConfig {
    /// Start building a configuration; `mycalls[n]` is our call on channel n
    pub fn builder(mycalls: Vec<Address>) -> DigipeaterConfigBuilder {
        DigipeaterConfigBuilder {
            mycalls,
            dedupe_time: DEFAULT_DEDUPE_TIME,
            pairs: Vec::new(),
            enabled: Vec::new(),
        }
    }

    /// Number of radio channels
    pub fn channel_count(&self) -> usize {
        self.mycalls.len()
    }

    /// Our call on `channel`
    pub fn mycall(&self, channel: usize) -> Option<&Address> {
        self.mycalls.get(channel)
    }

    /// All station calls, indexed by channel
    pub fn mycalls(&self) -> &[Address] {
        &self.mycalls
    }

    /// Duplicate window
    pub fn dedupe_time(&self) -> Duration {
        self.dedupe_time
    }

    /// Settings for the (from, to) pair, if configured
    pub fn pair(&self, from: usize, to: usize) -> Option<&ChannelPairConfig> {
        let n = self.channel_count();
        if from >= n || to >= n {
            return None;
        }
        self.pairs.get(from * n + to)?.as_ref()
    }
}

/// Builder for [`DigipeaterConfig`]
#[derive(Debug)]
pub struct DigipeaterConfigBuilder {
    mycalls: Vec<Address>,
    dedupe_time: Duration,
    pairs: Vec<(usize, usize, ChannelPairConfig)>,
    enabled: Vec<(usize, usize, bool)>,
}

impl DigipeaterConfigBuilder {
    /// Set the duplicate window
    pub fn dedupe_time(mut self, dedupe_time: Duration) -> Self {
        self.dedupe_time = dedupe_time;
        self
    }

    /// Configure a pair from pattern text
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if either pattern fails to
    /// compile.
    pub fn pair(
        self,
        from: usize,
        to: usize,
        alias: &str,
        wide: &str,
        preempt: PreemptMode,
    ) -> Result<Self, ConfigError> {
        let patterns = AddressPatterns::compile(alias, wide)?;
        Ok(self.pair_config(from, to, ChannelPairConfig::new(patterns, preempt)))
    }

    /// Configure a pair from prepared settings; a later call for the same
    /// pair replaces an earlier one
    pub fn pair_config(mut self, from: usize, to: usize, config: ChannelPairConfig) -> Self {
        self.pairs.push((from, to, config));
        self
    }

    /// Enable or disable a configured pair without dropping its patterns
    pub fn enabled(mut self, from: usize, to: usize, enabled: bool) -> Self {
        self.enabled.push((from, to, enabled));
        self
    }

    /// Validate and produce the configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if there are no channels, a pair names a
    /// channel that does not exist, or the duplicate window is 600 seconds
    /// or more.
    pub fn build(self) -> Result<DigipeaterConfig, ConfigError> {
        let n = self.mycalls.len();
        if n == 0 {
            return Err(ConfigError::NoChannels);
        }

        let secs = self.dedupe_time.as_secs();
        if secs >= MAX_DEDUPE_SECS {
            return Err(ConfigError::OutOfRange {
                name: "dedupe_time",
                value: secs,
                min: 0,
                max: MAX_DEDUPE_SECS - 1,
            });
        }

        let check = |channel: usize| {
            if channel < n {
                Ok(())
            } else {
                Err(ConfigError::ChannelOutOfRange { channel, count: n })
            }
        };

        let mut pairs: Vec<Option<ChannelPairConfig>> = (0..n * n).map(|_| None).collect();
        for (from, to, config) in self.pairs {
            check(from)?;
            check(to)?;
            pairs[from * n + to] = Some(config);
        }
        for (from, to, enabled) in self.enabled {
            check(from)?;
            check(to)?;
            if let Some(pair) = pairs[from * n + to].as_mut() {
                pair.enabled = enabled;
            }
        }

        Ok(DigipeaterConfig {
            mycalls: self.mycalls,
            dedupe_time: self.dedupe_time,
            pairs,
        })
    }
}

/// IGate configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgateConfig {
    /// Radio channel for APRS-IS to RF traffic; `None` disables that direction
    pub tx_channel: Option<usize>,

    /// Via path of the third-party wrapper sent over RF
    pub tx_via: Vec<Address>,

    /// Maximum packets gated to RF in one minute
    pub tx_limit_1: u32,

    /// Maximum packets gated to RF in five minutes
    pub tx_limit_5: u32,
}

impl Default for IgateConfig {
    fn default() -> Self {
        Self {
            tx_channel: None,
            tx_via: Vec::new(),
            tx_limit_1: DEFAULT_TX_LIMIT_1,
            tx_limit_5: DEFAULT_TX_LIMIT_5,
        }
    }
}

impl IgateConfig {
    /// Parse a via path such as `WIDE1-1,WIDE2-1`; case is folded to upper
    ///
    /// An empty string gives an empty path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] for a malformed hop or
    /// [`ConfigError::ViaPathTooLong`] for too many hops.
    pub fn parse_via(text: &str) -> Result<Vec<Address>, ConfigError> {
        let text = text.trim().trim_start_matches(',');
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let via = text
            .split(',')
            .map(|hop| {
                Address::parse(hop.trim().to_ascii_uppercase().as_str(), AddressMode::Strict)
                    .map(|(address, _)| address)
            })
            .collect::<Result<Vec<_>, _>>()?;
        if via.len() > MAX_REPEATERS {
            return Err(ConfigError::ViaPathTooLong(via.len()));
        }
        Ok(via)
    }

    /// Check limits and the transmit channel against `channel_count`
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self, channel_count: usize) -> Result<(), ConfigError> {
        if let Some(channel) = self.tx_channel {
            if channel >= channel_count {
                return Err(ConfigError::ChannelOutOfRange {
                    channel,
                    count: channel_count,
                });
            }
        }
        if self.tx_via.len() > MAX_REPEATERS {
            return Err(ConfigError::ViaPathTooLong(self.tx_via.len()));
        }
        check_limit("tx_limit_1", self.tx_limit_1, MAX_TX_LIMIT_1)?;
        check_limit("tx_limit_5", self.tx_limit_5, MAX_TX_LIMIT_5)?;
        Ok(())
    }
}

fn check_limit(name: &'static str, value: u32, max: u32) -> Result<(), ConfigError> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value: u64::from(value),
            min: 1,
            max: u64::from(max),
        })
    }
}
