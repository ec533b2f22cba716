//! Emoji → UTF-16 `\u` escapes for the legacy script encoding.
//!
//! The code point is decoded by hand from the UTF-8 bytes and split into a
//! surrogate pair when it lies above the BMP.

use super::EncodeError;

/// Code points strictly above this are written as a surrogate pair.
///
/// U+10000 itself stays a single (out of range) unit. Existing consumers of
/// the script output depend on that, so it is kept as is.
const SURROGATE_THRESHOLD: u32 = 0x10000;

/// Decode exactly one UTF-8 encoded character into its code point.
pub fn decode_utf8_single_char(bytes: &[u8]) -> Result<u32, EncodeError> {
    let (&lead, rest) = bytes.split_first().ok_or(EncodeError::EmptyInput)?;

    let (len, mut code_point) = match lead {
        0x00..=0x7F => (1, u32::from(lead)),
        0xC0..=0xDF => (2, u32::from(lead - 0xC0)),
        0xE0..=0xEF => (3, u32::from(lead - 0xE0)),
        0xF0..=0xF7 => (4, u32::from(lead - 0xF0)),
        _ => return Err(EncodeError::InvalidLeadByte(lead)),
    };

    if bytes.len() < len {
        return Err(EncodeError::Truncated {
            expected: len,
            found: bytes.len(),
        });
    }

    for &byte in &rest[..len - 1] {
        if !(0x80..=0xBF).contains(&byte) {
            return Err(EncodeError::InvalidContinuation(byte));
        }
        code_point = (code_point << 6) | u32::from(byte - 0x80);
    }

    if bytes.len() > len {
        return Err(EncodeError::TrailingBytes(bytes.len() - len));
    }

    Ok(code_point)
}

/// Split a code point into UTF-16 units.
pub fn to_utf16_units(code_point: u32) -> Vec<u32> {
    if code_point > SURROGATE_THRESHOLD {
        let offset = code_point - 0x10000;
        vec![(offset >> 10) + 0xD800, (offset % 0x400) + 0xDC00]
    } else {
        vec![code_point]
    }
}

/// Render units as a quoted run of `\uXXXX` escapes, followed by the field comma.
pub fn to_escaped_string(units: &[u32]) -> String {
    let escapes: String = units.iter().map(|unit| format!("\\u{:04x}", unit)).collect();
    format!("\"{}\",", escapes)
}

/// Encode a single-character emoji field value.
pub fn emoji_to_js(emoji: &str) -> Result<String, EncodeError> {
    let code_point = decode_utf8_single_char(emoji.as_bytes())?;
    Ok(to_escaped_string(&to_utf16_units(code_point)))
}
