// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! ASCII-over-registers codec
//!
//! Helios controllers do not map variables to individual registers. A request
//! is an ASCII command written as a block of holding registers, two characters
//! per register (big-endian), terminated by NUL and padded to an even length:
//!
//! ```text
//! "v00102"  ->  76 30 30 31 30 32 00 00  ->  [0x7630, 0x3031, 0x3032, 0x0000]
//! ```
//!
//! The answer is read back from the same address and decodes to
//! `"<code>=<value>"` followed by NUL, or by `'?'` when the device flags the
//! value as invalid.

use log::{debug, warn};

use super::error::{HeliosError, Result};

/// Characters that end a value in a device answer.
const TERMINATORS: [char; 2] = ['\0', '?'];

/// Encode an ASCII command into big-endian 16-bit registers.
///
/// A NUL terminator is appended and the byte sequence is padded with one more
/// `0x00` when its length is odd.
///
/// # Errors
///
/// [`HeliosError::NonAscii`] if `command` holds non-ASCII characters.
///
/// # Examples
///
/// ```
/// use rust_helios::helios::codec::encode;
///
/// assert_eq!(encode("v00102").unwrap(), vec![0x7630, 0x3031, 0x3032, 0x0000]);
/// assert_eq!(encode("").unwrap(), vec![0x0000]);
/// ```
pub fn encode(command: &str) -> Result<Vec<u16>> {
    if !command.is_ascii() {
        return Err(HeliosError::NonAscii(command.to_string()));
    }

    let mut bytes = Vec::with_capacity(command.len() + 2);
    bytes.extend_from_slice(command.as_bytes());
    bytes.push(0x00);
    if bytes.len() % 2 == 1 {
        bytes.push(0x00);
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

/// Decode big-endian 16-bit registers into an ASCII string.
///
/// Bytes outside the ASCII range are replaced by `'?'`. Padding and
/// terminators are kept, so `decode(&encode(s)?)` is `s` followed by one or two NULs.
pub fn decode(registers: &[u16]) -> String {
    registers
        .iter()
        .flat_map(|register| register.to_be_bytes())
        .map(|byte| if byte.is_ascii() { byte as char } else { '?' })
        .collect()
}

/// Extract the value of `code` from a decoded answer.
///
/// The answer must start with exactly `"<code>="`. The value is the text up to
/// the first NUL or `'?'` after the `=`. Returns `None` when the answer belongs
/// to another parameter or no terminator is present.
///
/// # Examples
///
/// ```
/// use rust_helios::helios::codec::extract_value;
///
/// assert_eq!(extract_value("v00102", "v00102=12?"), Some("12"));
/// assert_eq!(extract_value("v00102", "v00103=5\0"), None);
/// ```
pub fn extract_value<'a>(code: &str, decoded: &'a str) -> Option<&'a str> {
    let Some(rest) = decoded
        .strip_prefix(code)
        .and_then(|rest| rest.strip_prefix('='))
    else {
        warn!(
            "Answer {:?} does not match requested parameter {}",
            decoded, code
        );
        return None;
    };

    match rest.find(TERMINATORS) {
        Some(end) => {
            let value = &rest[..end];
            debug!("Value of {}: {:?}", code, value);
            Some(value)
        }
        None => {
            warn!("Answer {:?} for {} has no terminator", decoded, code);
            None
        }
    }
}
