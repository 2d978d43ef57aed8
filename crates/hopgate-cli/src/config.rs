//! Configuration file for the HOPGATE CLI.

use anyhow::Context;
use hopgate_core::{Address, DigipeaterConfig, IgateConfig, PreemptMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HOPGATE configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Radio channels, in channel-number order
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    /// Digipeater configuration
    #[serde(default)]
    pub digipeater: DigipeaterSection,
    /// IGate configuration
    #[serde(default)]
    pub igate: IgateSection,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// One radio channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Station callsign on this channel, e.g. `WB2OSZ-9`
    pub mycall: String,
}

/// Digipeater configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigipeaterSection {
    /// Duplicate window in seconds
    #[serde(default = "default_dedupe_secs")]
    pub dedupe_secs: u64,
    /// Channel-pair rules
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Digipeating rule for one (from, to) channel pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Receiving channel
    pub from: usize,
    /// Transmitting channel
    pub to: usize,
    /// Alias pattern
    pub alias: String,
    /// Wide pattern
    pub wide: String,
    /// Preemptive digipeating
    #[serde(default)]
    pub preempt: PreemptMode,
    /// Whether the rule is active
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// IGate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgateSection {
    /// Channel for APRS-IS to RF; absent means receive only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_channel: Option<usize>,
    /// Via path of gated packets, e.g. `WIDE1-1`
    #[serde(default)]
    pub tx_via: String,
    /// Packets per minute
    #[serde(default = "default_tx_limit_1")]
    pub tx_limit_1: u32,
    /// Packets per five minutes
    #[serde(default = "default_tx_limit_5")]
    pub tx_limit_5: u32,
}

/// Validated, compiled configuration ready for the core
#[derive(Debug)]
pub struct Runtime {
    /// Station call per channel
    pub mycalls: Vec<Address>,
    /// Digipeater settings
    pub digipeater: DigipeaterConfig,
    /// IGate settings
    pub igate: IgateConfig,
}

// Default values

fn default_log_level() -> String {
    "info".to_string()
}

fn default_dedupe_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_tx_limit_1() -> u32 {
    hopgate_core::config::DEFAULT_TX_LIMIT_1
}

fn default_tx_limit_5() -> u32 {
    hopgate_core::config::DEFAULT_TX_LIMIT_5
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for DigipeaterSection {
    fn default() -> Self {
        Self {
            dedupe_secs: default_dedupe_secs(),
            rules: Vec::new(),
        }
    }
}

impl Default for IgateSection {
    fn default() -> Self {
        Self {
            tx_channel: None,
            tx_via: String::new(),
            tx_limit_1: default_tx_limit_1(),
            tx_limit_5: default_tx_limit_5(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("hopgate/config.toml")
    }

    /// Single-channel digipeater with the usual `WIDEn-N` rules and a
    /// receive-only IGate
    #[must_use]
    pub fn starter() -> Self {
        Self {
            channels: vec![ChannelConfig {
                mycall: "N0CALL".to_string(),
            }],
            digipeater: DigipeaterSection {
                rules: vec![RuleConfig {
                    from: 0,
                    to: 0,
                    alias: "^WIDE[4-7]-[1-7]$".to_string(),
                    wide: "^WIDE[1-7]-[1-7]$".to_string(),
                    preempt: PreemptMode::Off,
                    enabled: true,
                }],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first problem found.
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        self.to_runtime().map(|_| ())
    }

    /// Station calls, one per channel
    ///
    /// # Errors
    ///
    /// Returns an error if no channels are configured or a call is invalid.
    pub fn mycalls(&self) -> anyhow::Result<Vec<Address>> {
        if self.channels.is_empty() {
            anyhow::bail!("At least one [[channels]] entry is required");
        }
        self.channels
            .iter()
            .enumerate()
            .map(|(i, channel)| {
                channel
                    .mycall
                    .to_ascii_uppercase()
                    .parse::<Address>()
                    .with_context(|| format!("channel {i}: invalid mycall '{}'", channel.mycall))
            })
            .collect()
    }

    /// Compile into the core configuration types
    ///
    /// # Errors
    ///
    /// Returns an error if any section fails validation.
    pub fn to_runtime(&self) -> anyhow::Result<Runtime> {
        let mycalls = self.mycalls()?;

        let mut builder = DigipeaterConfig::builder(mycalls.clone())
            .dedupe_time(Duration::from_secs(self.digipeater.dedupe_secs));
        for rule in &self.digipeater.rules {
            builder = builder
                .pair(rule.from, rule.to, &rule.alias, &rule.wide, rule.preempt)
                .with_context(|| format!("digipeater rule {} -> {}", rule.from, rule.to))?
                .enabled(rule.from, rule.to, rule.enabled);
        }
        let digipeater = builder.build().context("digipeater")?;

        let igate = IgateConfig {
            tx_channel: self.igate.tx_channel,
            tx_via: IgateConfig::parse_via(&self.igate.tx_via).context("igate tx_via")?,
            tx_limit_1: self.igate.tx_limit_1,
            tx_limit_5: self.igate.tx_limit_5,
        };
        igate.validate(mycalls.len()).context("igate")?;

        Ok(Runtime {
            mycalls,
            digipeater,
            igate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[logging]
level = "debug"

[[channels]]
mycall = "WB2OSZ-9"

[[channels]]
mycall = "wb2osz-5"

[digipeater]
dedupe_secs = 20

[[digipeater.rules]]
from = 0
to = 0
alias = "^WIDE[4-7]-[1-7]|CITYD$"
wide = "^WIDE[1-7]-[1-7]$|^TRACE[1-7]-[1-7]$"
preempt = "trace"

[[digipeater.rules]]
from = 0
to = 1
alias = "^$"
wide = "^WIDE[1-7]-[1-7]$"
enabled = false

[igate]
tx_channel = 1
tx_via = "WIDE1-1"
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.digipeater.dedupe_secs, 30);
        assert_eq!(config.igate.tx_limit_1, 6);
        assert_eq!(config.igate.tx_limit_5, 20);
        // No channels yet.
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_to_runtime() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();
        let runtime = config.to_runtime().unwrap();

        assert_eq!(runtime.mycalls[1].to_string(), "WB2OSZ-5");
        assert_eq!(runtime.digipeater.dedupe_time(), Duration::from_secs(20));
        let pair = runtime.digipeater.pair(0, 0).unwrap();
        assert_eq!(pair.preempt, PreemptMode::Trace);
        assert!(!runtime.digipeater.pair(0, 1).unwrap().enabled);
        assert_eq!(runtime.igate.tx_channel, Some(1));
        assert_eq!(runtime.igate.tx_via.len(), 1);
    }

    #[test]
    fn test_config_validation() {
        let mut config: Config = toml::from_str(SAMPLE).unwrap();

        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
        config.logging.level = "info".to_string();

        config.digipeater.dedupe_secs = 600;
        assert!(config.validate().is_err());
        config.digipeater.dedupe_secs = 30;

        config.digipeater.rules[0].wide = "^WIDE[".to_string();
        assert!(config.validate().is_err());
        config.digipeater.rules[0].wide = "^WIDE[1-7]-[1-7]$".to_string();

        config.igate.tx_channel = Some(2);
        assert!(config.validate().is_err());
        config.igate.tx_channel = Some(0);

        config.channels[0].mycall = "TOOLONGCALL".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config: Config = toml::from_str(SAMPLE).unwrap();
        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.channels.len(), 2);
        assert_eq!(loaded.digipeater.rules.len(), 2);
        assert_eq!(loaded.digipeater.rules[0].preempt, PreemptMode::Trace);
        assert_eq!(loaded.igate.tx_channel, Some(1));
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_starter_is_valid() {
        let runtime = Config::starter().to_runtime().unwrap();
        assert_eq!(runtime.mycalls.len(), 1);
        assert!(runtime.digipeater.pair(0, 0).is_some());
        assert_eq!(runtime.igate.tx_channel, None);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(dir.path().join("absent.toml")).is_err());
    }
}
