//! Alias and wide-area address classification.
//!
//! Each channel pair carries two precompiled patterns. A repeater token
//! (for example `WIDE2-2` or `CITYD`) is an *alias* if it matches the
//! alias pattern and a *wide* token if it matches the wide pattern. Alias
//! wins when both match.

use crate::error::{ConfigError, PatternError};
use regex::Regex;
use std::fmt;

/// Something that can decide whether an address token matches
///
/// Implemented for [`Regex`]. A matcher may fail at evaluation time; the
/// failure is logged and the token is treated as not matching.
pub trait AddressMatcher: fmt::Debug + Send + Sync {
    /// Test `token`, the address rendered as `CALL` or `CALL-SSID`
    fn is_match(&self, token: &str) -> Result<bool, PatternError>;
}

impl AddressMatcher for Regex {
    fn is_match(&self, token: &str) -> Result<bool, PatternError> {
        Ok(Regex::is_match(self, token))
    }
}

/// Result of classifying one repeater token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Matches the alias pattern
    Alias,
    /// Matches the wide pattern and not the alias pattern
    Wide,
    /// Matches neither
    NoMatch,
}

/// The alias and wide patterns of one channel pair
#[derive(Debug)]
pub struct AddressPatterns {
    alias: Box<dyn AddressMatcher>,
    wide: Box<dyn AddressMatcher>,
}

impl AddressPatterns {
    /// Compile both patterns as regular expressions
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] naming the pattern that
    /// failed to compile.
    pub fn compile(alias: &str, wide: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            alias: Box::new(compile_one("alias", alias)?),
            wide: Box::new(compile_one("wide", wide)?),
        })
    }

    /// Build from arbitrary matchers
    pub fn from_matchers(
        alias: impl AddressMatcher + 'static,
        wide: impl AddressMatcher + 'static,
    ) -> Self {
        Self {
            alias: Box::new(alias),
            wide: Box::new(wide),
        }
    }

    /// Whether `token` matches the alias pattern
    pub fn is_alias(&self, token: &str) -> bool {
        evaluate("alias", self.alias.as_ref(), token)
    }

    /// Whether `token` matches the wide pattern
    pub fn is_wide(&self, token: &str) -> bool {
        evaluate("wide", self.wide.as_ref(), token)
    }

    /// Classify a token, alias first
    pub fn classify(&self, token: &str) -> Classification {
        if self.is_alias(token) {
            Classification::Alias
        } else if self.is_wide(token) {
            Classification::Wide
        } else {
            Classification::NoMatch
        }
    }
}

fn compile_one(kind: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        kind,
        pattern: pattern.to_string(),
        source,
    })
}

fn evaluate(kind: &str, matcher: &dyn AddressMatcher, token: &str) -> bool {
    match matcher.is_match(token) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::warn!("Digipeater: {} pattern failed, treating as no match: {}", kind, e);
            false
        }
    }
}
