//! Armor: text-safe encoding of payloads.
//!
//! Format: zlib-compressed UTF-8, base64 (standard alphabet, padded), broken
//! into 64-character lines. Whitespace is ignored when decoding.
//!
//! The bookended form wraps the same body in `-----BEGIN <LABEL>-----` and
//! `-----END <LABEL>-----` lines for payloads kept in files.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use thiserror::Error;

const LINE_WIDTH: usize = 64;

/// Largest payload [`unwrap`] will inflate. Matches the transport frame cap.
pub const MAX_PLAIN_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ArmorError {
    #[error("Nothing to armor")]
    Empty,

    #[error("Armored text decodes to nothing")]
    EmptyResult,

    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Payload is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Missing armor boundary: {0}")]
    Boundary(&'static str),

    #[error("Payload inflates past {limit} bytes")]
    TooLarge { limit: usize },
}

/// Armor `plain` for transport.
pub fn wrap(plain: &str) -> Result<String, ArmorError> {
    if plain.is_empty() {
        return Err(ArmorError::Empty);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(plain.as_bytes())?;
    let compressed = encoder.finish()?;

    let encoded = STANDARD.encode(compressed);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH + 1);
    for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
        // base64 output is ASCII, so every chunk boundary is a char boundary.
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }
    Ok(out)
}

/// Inverse of [`wrap`].
pub fn unwrap(armored: &str) -> Result<String, ArmorError> {
    unwrap_limited(armored, MAX_PLAIN_LEN)
}

fn unwrap_limited(armored: &str, limit: usize) -> Result<String, ArmorError> {
    let compact: String = armored.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(ArmorError::Empty);
    }

    let compressed = STANDARD.decode(compact)?;
    let decoder = ZlibDecoder::new(compressed.as_slice());
    let mut bytes = Vec::new();
    decoder.take(limit as u64 + 1).read_to_end(&mut bytes)?;
    if bytes.len() > limit {
        return Err(ArmorError::TooLarge { limit });
    }

    let text = String::from_utf8(bytes)?;
    if text.is_empty() {
        return Err(ArmorError::EmptyResult);
    }
    Ok(text)
}

/// Armor `plain` between BEGIN/END boundary lines.
pub fn wrap_bookended(plain: &str, label: &str) -> Result<String, ArmorError> {
    let body = wrap(plain)?;
    Ok(format!("-----BEGIN {label}-----\n{body}-----END {label}-----\n"))
}

/// Decode bookended armor, or bare armor if no boundary is present.
pub fn unwrap_bookended(text: &str) -> Result<String, ArmorError> {
    let Some(begin) = text.find("-----BEGIN ") else {
        return unwrap(text);
    };

    let after_begin = &text[begin..];
    let body_start = after_begin
        .find('\n')
        .ok_or(ArmorError::Boundary("BEGIN line is not terminated"))?;
    let body = &after_begin[body_start + 1..];
    let body_end = body
        .find("-----END ")
        .ok_or(ArmorError::Boundary("END line not found"))?;

    unwrap(&body[..body_end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for text in ["x", "hello notary", "<notaryMessage command=\"pingNotary\"/>\n", "ünïcödé ✓"] {
            assert_eq!(unwrap(&wrap(text).unwrap()).unwrap(), text);
        }
    }

    #[test]
    fn test_inflation_is_bounded() {
        let armored = wrap(&"0".repeat(4096)).unwrap();
        assert!(armored.len() < 200);

        assert_eq!(unwrap_limited(&armored, 4096).unwrap().len(), 4096);
        assert!(matches!(
            unwrap_limited(&armored, 4095),
            Err(ArmorError::TooLarge { limit: 4095 })
        ));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(wrap(""), Err(ArmorError::Empty)));
        assert!(matches!(unwrap(""), Err(ArmorError::Empty)));
        assert!(matches!(unwrap(" \n "), Err(ArmorError::Empty)));
    }

    #[test]
    fn test_lines_are_bounded() {
        let long = "basket ".repeat(500);
        let armored = wrap(&long).unwrap();
        assert!(armored.lines().all(|line| line.len() <= LINE_WIDTH));
        assert_eq!(unwrap(&armored).unwrap(), long);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(unwrap("!!!not base64!!!"), Err(ArmorError::Base64(_))));
        // Valid base64, but not a zlib stream.
        assert!(matches!(unwrap("aGVsbG8="), Err(ArmorError::Compression(_))));
    }

    #[test]
    fn test_bookended() {
        let text = wrap_bookended("basket contents", "NOTARY BASKET").unwrap();
        assert!(text.starts_with("-----BEGIN NOTARY BASKET-----\n"));
        assert!(text.ends_with("-----END NOTARY BASKET-----\n"));
        assert_eq!(unwrap_bookended(&text).unwrap(), "basket contents");

        let bare = wrap("bare").unwrap();
        assert_eq!(unwrap_bookended(&bare).unwrap(), "bare");

        assert!(matches!(
            unwrap_bookended("-----BEGIN X-----\nabc"),
            Err(ArmorError::Boundary(_))
        ));
    }
}
