//! SLP escape handling (RFC 2608, section 5.3).
//!
//! Reserved characters are written as `\HH` with two uppercase hex digits;
//! decoding accepts either case. Opaque values escape every payload byte.

use slp_types::{error::SlpError, utils::indicators::is_reserved_char};

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

pub(crate) fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn push_escaped(out: &mut String, byte: u8) {
    out.push('\\');
    out.push(HEX_UPPER[usize::from(byte >> 4)] as char);
    out.push(HEX_UPPER[usize::from(byte & 0x0f)] as char);
}

/// Escape a string value for the attribute wire form.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());

    for ch in value.chars() {
        if ch.is_ascii() && is_reserved_char(ch as u8) {
            push_escaped(&mut out, ch as u8);
        } else {
            out.push(ch);
        }
    }

    out
}

/// Escape an opaque payload: every byte becomes `\HH`.
///
/// The caller prepends the `\FF` type marker; an empty payload therefore
/// serializes as exactly `\FF`.
pub fn escape_opaque(payload: &[u8]) -> String {
    let mut out = String::with_capacity(payload.len() * 3);

    for byte in payload {
        push_escaped(&mut out, *byte);
    }

    out
}

/// Undo `\HH` escaping.
///
/// A `\` in the last or second-to-last position, or one followed by anything
/// other than two hex digits, is a parse error. The result is raw bytes: an
/// escape may decode to a byte that is not valid UTF-8 on its own.
pub fn unescape_attr(value: &str) -> Result<Vec<u8>, SlpError> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        let byte = bytes[index];
        if byte == b'\\' {
            let (high, low) = match (bytes.get(index + 1), bytes.get(index + 2)) {
                (Some(high), Some(low)) => (*high, *low),
                _ => return Err(SlpError::Parse("truncated escape sequence")),
            };
            match (hex_value(high), hex_value(low)) {
                (Some(high), Some(low)) => out.push(high << 4 | low),
                _ => return Err(SlpError::Parse("invalid escape sequence")),
            }
            index += 3;
        } else {
            out.push(byte);
            index += 1;
        }
    }

    Ok(out)
}
