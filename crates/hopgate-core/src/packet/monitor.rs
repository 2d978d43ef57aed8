//! Monitor-format text codec.

use super::{Address, AddressMode, MAX_INFO_LEN, MAX_REPEATERS, Packet};
use crate::error::PacketError;

/// Parse `SRC>DST[,VIA...]:INFO`
pub(super) fn parse(bytes: &[u8], mode: AddressMode) -> Result<Packet, PacketError> {
    let text = unescape_hex(bytes);

    let separator = text
        .iter()
        .position(|&b| b == b':')
        .ok_or(PacketError::MissingInfoSeparator)?;
    let (header, rest) = text.split_at(separator);

    let mut info = rest[1..].to_vec();
    if info.len() > MAX_INFO_LEN {
        tracing::warn!(
            "Information part of {} bytes truncated to {}",
            info.len(),
            MAX_INFO_LEN
        );
        info.truncate(MAX_INFO_LEN);
    }

    let header = std::str::from_utf8(header).map_err(|_| PacketError::InvalidAddress {
        address: String::from_utf8_lossy(header).into_owned(),
        reason: "non-ASCII address header",
    })?;

    let (source_text, rest) = header.split_once('>').ok_or(if header.is_empty() {
        PacketError::MissingSource
    } else {
        PacketError::MissingDestination
    })?;
    if source_text.is_empty() {
        return Err(PacketError::MissingSource);
    }
    let (source, _) = Address::parse(source_text, mode)?;

    let mut fields = rest.split(',');
    let destination_text = fields
        .next()
        .filter(|t| !t.is_empty())
        .ok_or(PacketError::MissingDestination)?;
    let (destination, _) = Address::parse(destination_text, mode)?;

    let mut repeaters: Vec<Address> = Vec::with_capacity(MAX_REPEATERS);
    for token in fields {
        if repeaters.len() == MAX_REPEATERS {
            tracing::debug!(
                "Ignoring via addresses beyond {} in {}",
                MAX_REPEATERS,
                header
            );
            break;
        }
        let (mut address, heard) = Address::parse(token, mode)?;
        if heard {
            // A '*' means this hop and everything before it has been repeated.
            repeaters.iter_mut().for_each(Address::mark_used);
            address.mark_used();
        }
        repeaters.push(address);
    }

    Ok(Packet {
        source,
        destination,
        repeaters,
        info,
    })
}

/// Address header without the information separator
pub(super) fn format_path(packet: &Packet) -> String {
    let mut out = format!("{}>{}", packet.source, packet.destination);
    let heard = packet.heard_index();
    for (index, repeater) in packet.repeaters.iter().enumerate() {
        out.push(',');
        out.push_str(&repeater.to_string());
        if Some(index) == heard {
            out.push('*');
        }
    }
    out
}

/// Translate `<0xNN>` escapes back into raw bytes
fn unescape_hex(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        match hex_escape_at(&input[i..]) {
            Some(byte) => {
                out.push(byte);
                i += 6;
            }
            None => {
                out.push(input[i]);
                i += 1;
            }
        }
    }
    out
}

fn hex_escape_at(s: &[u8]) -> Option<u8> {
    match s {
        [b'<', b'0', b'x', hi, lo, b'>', ..] => {
            let hi = char::from(*hi).to_digit(16)?;
            let lo = char::from(*lo).to_digit(16)?;
            u8::try_from(hi * 16 + lo).ok()
        }
        _ => None,
    }
}
