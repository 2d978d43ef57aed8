//! Station addresses: callsign, SSID and the has-been-repeated flag.

use crate::error::PacketError;
use std::fmt;
use std::str::FromStr;

/// Largest SSID an AX.25 address can carry
pub const MAX_SSID: u8 = 15;

/// Callsign length limit for addresses heard over the air
const STRICT_CALLSIGN_LEN: usize = 6;

/// Callsign length limit for addresses coming from the internet side
const RELAXED_CALLSIGN_LEN: usize = 11;

/// How strictly address tokens are validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    /// RF rules: up to 6 upper-case alphanumerics
    Strict,
    /// APRS-IS rules: up to 11 alphanumerics, any case
    Relaxed,
}

/// One address of a packet
///
/// The `used` flag is the AX.25 "has been repeated" bit. It only carries
/// meaning for repeater slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    callsign: String,
    ssid: u8,
    used: bool,
}

impl Address {
    /// Create an address after validating it with relaxed rules
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::InvalidAddress`] if the callsign is empty, too
    /// long, not alphanumeric, or the SSID is above 15.
    pub fn new(callsign: &str, ssid: u8) -> Result<Self, PacketError> {
        let invalid = |reason| PacketError::InvalidAddress {
            address: format!("{callsign}-{ssid}"),
            reason,
        };
        check_callsign(callsign, AddressMode::Relaxed).map_err(invalid)?;
        if ssid > MAX_SSID {
            return Err(invalid("SSID not in range 0..=15"));
        }
        Ok(Self::new_unchecked(callsign, ssid))
    }

    /// Build an address from parts already known to be valid
    pub(crate) fn new_unchecked(callsign: &str, ssid: u8) -> Self {
        Self {
            callsign: callsign.to_string(),
            ssid,
            used: false,
        }
    }

    /// Parse a token such as `WB2OSZ-9` or `WIDE2-1*`
    ///
    /// Returns the address and whether the token carried a trailing `*`.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::InvalidAddress`] describing the first rule the
    /// token breaks.
    pub fn parse(token: &str, mode: AddressMode) -> Result<(Self, bool), PacketError> {
        let invalid = |reason| PacketError::InvalidAddress {
            address: token.to_string(),
            reason,
        };

        let (body, heard) = match token.strip_suffix('*') {
            Some(body) => (body, true),
            None => (token, false),
        };

        let (callsign, ssid_text) = match body.split_once('-') {
            Some((callsign, ssid)) => (callsign, Some(ssid)),
            None => (body, None),
        };

        check_callsign(callsign, mode).map_err(invalid)?;

        let ssid = match ssid_text {
            None => 0,
            Some(text) => {
                if text.is_empty() || text.len() > 2 {
                    return Err(invalid("SSID must be one or two digits"));
                }
                if !text.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid("SSID must be digits"));
                }
                let ssid: u8 = text.parse().map_err(|_| invalid("SSID must be digits"))?;
                if ssid > MAX_SSID {
                    return Err(invalid("SSID not in range 0..=15"));
                }
                ssid
            }
        };

        Ok((Self::new_unchecked(callsign, ssid), heard))
    }

    /// Callsign without SSID
    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    /// Secondary station identifier, 0..=15
    pub fn ssid(&self) -> u8 {
        self.ssid
    }

    /// Replace the SSID, keeping the callsign
    pub fn set_ssid(&mut self, ssid: u8) {
        debug_assert!(ssid <= MAX_SSID);
        self.ssid = ssid.min(MAX_SSID);
    }

    /// Whether the has-been-repeated bit is set
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Set the has-been-repeated bit
    pub fn mark_used(&mut self) {
        self.used = true;
    }

    /// Copy of this address with the has-been-repeated bit set
    #[must_use]
    pub fn as_used(&self) -> Self {
        Self {
            used: true,
            ..self.clone()
        }
    }

    /// Same callsign and SSID, regardless of the used flag
    pub fn same_station(&self, other: &Address) -> bool {
        self.ssid == other.ssid && self.callsign == other.callsign
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ssid == 0 {
            f.write_str(&self.callsign)
        } else {
            write!(f, "{}-{}", self.callsign, self.ssid)
        }
    }
}

impl FromStr for Address {
    type Err = PacketError;

    /// Parse a station identity with RF rules; a trailing `*` sets the used flag
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mut address, heard) = Self::parse(s, AddressMode::Strict)?;
        if heard {
            address.mark_used();
        }
        Ok(address)
    }
}

fn check_callsign(callsign: &str, mode: AddressMode) -> Result<(), &'static str> {
    let max_len = match mode {
        AddressMode::Strict => STRICT_CALLSIGN_LEN,
        AddressMode::Relaxed => RELAXED_CALLSIGN_LEN,
    };

    if callsign.is_empty() {
        return Err("empty callsign");
    }
    if callsign.len() > max_len {
        return Err("callsign too long");
    }
    if !callsign.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err("invalid character in callsign");
    }
    if mode == AddressMode::Strict && callsign.bytes().any(|b| b.is_ascii_lowercase()) {
        return Err("callsign must be upper case");
    }
    Ok(())
}
