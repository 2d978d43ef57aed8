//! Packet model shared by the digipeater and the IGate.
//!
//! A [`Packet`] is a source, a destination, up to [`MAX_REPEATERS`] via
//! addresses and an opaque information part. Packets travel in "monitor
//! format" text:
//!
//! ```text
//! W1ABC-5>APRS,WIDE1-1*,WIDE2-1:!4237.14N/07120.83W-
//! └──┬──┘ └┬─┘ └──────┬──────┘ └─────────┬─────────┘
//!  source  dest   repeaters           information
//! ```
//!
//! A `*` follows the last repeater whose has-been-repeated bit is set.

pub mod address;
mod monitor;

pub use address::{Address, AddressMode, MAX_SSID};

use crate::error::PacketError;
use std::fmt;
use std::ops::Range;

/// Maximum number of via (repeater) addresses in a path
pub const MAX_REPEATERS: usize = 8;

/// Maximum information part length; longer input is truncated
pub const MAX_INFO_LEN: usize = 2048;

/// APRS data type indicator of a third-party (encapsulated) packet
pub const THIRD_PARTY_DTI: u8 = b'}';

/// APRS data type indicator of a query
pub const QUERY_DTI: u8 = b'?';

/// Compact identity of a packet for duplicate suppression
///
/// Computed from source, destination and information only, so two copies
/// of a packet heard over different paths share a fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 8]);

impl Fingerprint {
    /// Raw fingerprint bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", hex::encode(self.0))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// An AX.25 UI frame as seen by the decision layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    source: Address,
    destination: Address,
    repeaters: Vec<Address>,
    info: Vec<u8>,
}

impl Packet {
    /// Create a packet with an empty via path
    pub fn new(source: Address, destination: Address, info: impl Into<Vec<u8>>) -> Self {
        let mut info = info.into();
        info.truncate(MAX_INFO_LEN);
        Self {
            source,
            destination,
            repeaters: Vec::new(),
            info,
        }
    }

    /// Parse monitor-format text
    ///
    /// # Errors
    ///
    /// Returns a [`PacketError`] if the header is malformed or any address
    /// fails validation for `mode`.
    pub fn from_text(text: &str, mode: AddressMode) -> Result<Self, PacketError> {
        monitor::parse(text.as_bytes(), mode)
    }

    /// Parse monitor-format bytes; the information part may be binary
    ///
    /// # Errors
    ///
    /// Same as [`Packet::from_text`].
    pub fn from_bytes(bytes: &[u8], mode: AddressMode) -> Result<Self, PacketError> {
        monitor::parse(bytes, mode)
    }

    /// Originating station
    pub fn source(&self) -> &Address {
        &self.source
    }

    /// Destination (for APRS, usually a software tocall)
    pub fn destination(&self) -> &Address {
        &self.destination
    }

    /// Mutable destination
    pub fn destination_mut(&mut self) -> &mut Address {
        &mut self.destination
    }

    /// Via path, in transmission order
    pub fn repeaters(&self) -> &[Address] {
        &self.repeaters
    }

    /// Number of via addresses
    pub fn repeater_count(&self) -> usize {
        self.repeaters.len()
    }

    /// Via address at `index`
    pub fn repeater(&self, index: usize) -> Option<&Address> {
        self.repeaters.get(index)
    }

    /// Mutable via address at `index`
    pub fn repeater_mut(&mut self, index: usize) -> Option<&mut Address> {
        self.repeaters.get_mut(index)
    }

    /// Append a via address
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::TooManyRepeaters`] when the path is full.
    pub fn push_repeater(&mut self, address: Address) -> Result<(), PacketError> {
        if self.repeaters.len() >= MAX_REPEATERS {
            return Err(PacketError::TooManyRepeaters);
        }
        self.repeaters.push(address);
        Ok(())
    }

    /// Insert a via address before `index`, shifting later entries right
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::TooManyRepeaters`] when the path is full and
    /// [`PacketError::RepeaterIndex`] when `index` is past the end.
    pub fn insert_repeater(&mut self, index: usize, address: Address) -> Result<(), PacketError> {
        if self.repeaters.len() >= MAX_REPEATERS {
            return Err(PacketError::TooManyRepeaters);
        }
        if index > self.repeaters.len() {
            return Err(PacketError::RepeaterIndex {
                index,
                count: self.repeaters.len(),
            });
        }
        self.repeaters.insert(index, address);
        Ok(())
    }

    /// Remove the via addresses in `range`; out-of-bounds parts are ignored
    pub fn remove_repeaters(&mut self, range: Range<usize>) {
        let end = range.end.min(self.repeaters.len());
        let start = range.start.min(end);
        self.repeaters.drain(start..end);
    }

    /// Replace the whole via path
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::TooManyRepeaters`] if `path` is longer than
    /// [`MAX_REPEATERS`]; the packet is left unchanged.
    pub fn set_repeaters(&mut self, path: Vec<Address>) -> Result<(), PacketError> {
        if path.len() > MAX_REPEATERS {
            return Err(PacketError::TooManyRepeaters);
        }
        self.repeaters = path;
        Ok(())
    }

    /// Index of the first via address not yet repeated
    pub fn first_unused_repeater(&self) -> Option<usize> {
        self.repeaters.iter().position(|a| !a.is_used())
    }

    /// Index of the last via address already repeated
    pub fn heard_index(&self) -> Option<usize> {
        self.repeaters.iter().rposition(Address::is_used)
    }

    /// Information part
    pub fn info(&self) -> &[u8] {
        &self.info
    }

    /// Shorten the information part to `len` bytes
    pub fn truncate_info(&mut self, len: usize) {
        self.info.truncate(len);
    }

    /// First byte of the information part
    pub fn data_type(&self) -> Option<u8> {
        self.info.first().copied()
    }

    /// Whether this is an APRS third-party packet
    pub fn is_third_party(&self) -> bool {
        self.data_type() == Some(THIRD_PARTY_DTI)
    }

    /// Decode the packet carried inside a third-party packet
    ///
    /// The inner header comes from the internet side, so addresses are
    /// parsed with relaxed rules.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::NotThirdParty`] if the data type is not `}` or
    /// the inner parse error otherwise.
    pub fn unwrap_third_party(&self) -> Result<Packet, PacketError> {
        match self.info.split_first() {
            Some((&THIRD_PARTY_DTI, inner)) => monitor::parse(inner, AddressMode::Relaxed),
            _ => Err(PacketError::NotThirdParty),
        }
    }

    /// Wrap `payload` (a complete monitor-format packet) as third-party traffic
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::TooManyRepeaters`] if `via` is too long.
    pub fn third_party(
        source: Address,
        destination: Address,
        via: Vec<Address>,
        payload: &[u8],
    ) -> Result<Packet, PacketError> {
        let mut info = Vec::with_capacity(payload.len() + 1);
        info.push(THIRD_PARTY_DTI);
        info.extend_from_slice(payload);
        let mut packet = Packet::new(source, destination, info);
        packet.set_repeaters(via)?;
        Ok(packet)
    }

    /// Duplicate-suppression fingerprint
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.source.to_string().as_bytes());
        hasher.update(&[0]);
        hasher.update(self.destination.to_string().as_bytes());
        hasher.update(&[0]);
        hasher.update(&self.info);
        let hash = hasher.finalize();

        let mut fingerprint = [0u8; 8];
        fingerprint.copy_from_slice(&hash.as_bytes()[..8]);
        Fingerprint(fingerprint)
    }

    /// Address header without the trailing `:`
    pub fn format_path(&self) -> String {
        monitor::format_path(self)
    }

    /// Address header including the trailing `:`
    pub fn format_addrs(&self) -> String {
        let mut header = monitor::format_path(self);
        header.push(':');
        header
    }

    /// Complete monitor-format bytes: header followed by the raw information
    pub fn to_monitor_bytes(&self) -> Vec<u8> {
        let mut bytes = self.format_addrs().into_bytes();
        bytes.extend_from_slice(&self.info);
        bytes
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.format_addrs(),
            String::from_utf8_lossy(&self.info)
        )
    }
}
