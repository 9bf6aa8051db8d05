//! Modified UTF-7 for mailbox names.
//!
//! IMAP transports mailbox names as 7-bit text. Printable US-ASCII (except `&`) represents itself,
//! `&` is written as `&-`, and every other run of characters is shifted into a `&...-` sequence
//! holding the modified BASE64 encoding of its UTF-16BE code units ([RFC 3501, section 5.1.3]).
//!
//! ```rust
//! use imap_pipeline::utf7;
//!
//! assert_eq!(utf7::encode("测试"), "&bUuL1Q-");
//! assert_eq!(utf7::decode("&bUuL1Q-").unwrap(), "测试");
//! ```
//!
//! [RFC 3501, section 5.1.3]: https://www.rfc-editor.org/rfc/rfc3501#section-5.1.3

use std::borrow::Cow;

use base64::{
    alphabet::Alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

use crate::{error::DecodeError, utils::indicators::is_printable};

/// BASE64 with `,` instead of `/`.
const MODIFIED_BASE64_ALPHABET: Alphabet =
    match Alphabet::new("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+,") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("modified BASE64 alphabet is invalid"),
    };

/// Modified BASE64 never uses padding.
const MODIFIED_BASE64: GeneralPurpose = GeneralPurpose::new(
    &MODIFIED_BASE64_ALPHABET,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

const SHIFT: char = '&';
const UNSHIFT: char = '-';

fn represents_itself(c: char) -> bool {
    c.is_ascii() && is_printable(c as u8) && c != SHIFT
}

/// Encode `input` into modified UTF-7.
///
/// Borrows when nothing needs to be shifted.
pub fn encode(input: &str) -> Cow<str> {
    if input.chars().all(represents_itself) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() * 2);
    let mut shifted: Vec<u16> = Vec::new();

    for c in input.chars() {
        if represents_itself(c) {
            flush(&mut shifted, &mut out);
            out.push(c);
        } else if c == SHIFT {
            flush(&mut shifted, &mut out);
            out.push(SHIFT);
            out.push(UNSHIFT);
        } else {
            let mut buffer = [0u16; 2];
            shifted.extend_from_slice(c.encode_utf16(&mut buffer));
        }
    }

    flush(&mut shifted, &mut out);

    Cow::Owned(out)
}

fn flush(shifted: &mut Vec<u16>, out: &mut String) {
    if shifted.is_empty() {
        return;
    }

    let bytes: Vec<u8> = shifted.drain(..).flat_map(u16::to_be_bytes).collect();

    out.push(SHIFT);
    MODIFIED_BASE64.encode_string(bytes, out);
    out.push(UNSHIFT);
}

/// Decode modified UTF-7 back into UTF-8.
///
/// Fails on non-ASCII input, unterminated or malformed shift sequences, and invalid UTF-16.
pub fn decode(input: &str) -> Result<Cow<str>, DecodeError> {
    if let Some(position) = input.bytes().position(|b| !b.is_ascii()) {
        return Err(DecodeError::NonAscii(position));
    }

    if !input.contains(SHIFT) {
        return Ok(Cow::Borrowed(input));
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut offset = 0;

    while let Some(start) = rest.find(SHIFT) {
        out.push_str(&rest[..start]);

        let sequence = &rest[start + 1..];
        let end = sequence
            .find(UNSHIFT)
            .ok_or(DecodeError::Unterminated(offset + start))?;
        let encoded = &sequence[..end];

        if encoded.is_empty() {
            out.push(SHIFT);
        } else {
            out.push_str(&decode_shifted(encoded, offset + start + 1)?);
        }

        let consumed = start + 1 + end + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);

    Ok(Cow::Owned(out))
}

fn decode_shifted(encoded: &str, at: usize) -> Result<String, DecodeError> {
    let bytes = MODIFIED_BASE64
        .decode(encoded)
        .map_err(|_| DecodeError::Base64(at))?;

    if bytes.len() % 2 != 0 {
        return Err(DecodeError::Utf16Length(at));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units).map_err(|_| DecodeError::Utf16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let tests = [
            ("", ""),
            ("INBOX", "INBOX"),
            ("folder ABC", "folder ABC"),
            ("A&B", "A&-B"),
            ("&", "&-"),
            ("&&", "&-&-"),
            ("测试", "&bUuL1Q-"),
            ("Project\u{00A0}Notes", "Project&AKA-Notes"),
            ("~peter/mail/台北/日本語", "~peter/mail/&U,BTFw-/&ZeVnLIqe-"),
            ("Entw\u{00FC}rfe", "Entw&APw-rfe"),
            ("tab\there", "tab&AAk-here"),
            ("\u{1F600}", "&2D3eAA-"),
        ];

        for (test, expected) in tests {
            assert_eq!(expected, encode(test), "{test:?}");
        }
    }

    #[test]
    fn test_encode_borrows_when_possible() {
        assert!(matches!(encode("Sent Items"), Cow::Borrowed(_)));
        assert!(matches!(encode("A&B"), Cow::Owned(_)));
    }

    #[test]
    fn test_decode() {
        let tests = [
            ("", ""),
            ("INBOX", "INBOX"),
            ("A&-B", "A&B"),
            ("&bUuL1Q-", "测试"),
            ("Project&AKA-Notes", "Project\u{00A0}Notes"),
            ("~peter/mail/&U,BTFw-/&ZeVnLIqe-", "~peter/mail/台北/日本語"),
            ("&2D3eAA-", "\u{1F600}"),
        ];

        for (test, expected) in tests {
            assert_eq!(expected, decode(test).unwrap(), "{test:?}");
        }
    }

    #[test]
    fn test_decode_failures() {
        let tests = [
            ("тест", DecodeError::NonAscii(0)),
            ("Bad&AAA", DecodeError::Unterminated(3)),
            ("Bad&AA=-", DecodeError::Base64(4)),
            ("Bad&A-", DecodeError::Base64(4)),
            ("Bad&AA-", DecodeError::Utf16Length(4)),
            ("Bad&2AA-", DecodeError::Utf16),
        ];

        for (test, expected) in tests {
            assert_eq!(Err(expected), decode(test), "{test:?}");
        }
    }

    #[test]
    fn test_round_trip() {
        let tests = [
            "",
            "&",
            "&-",
            "a&b&c",
            "Gel\u{00F6}scht",
            "测试/子文件夹",
            "mixed 测 and & and \\ and \"",
            "\r\n\0",
            "\u{7f}\u{1F4EC}x",
        ];

        for test in tests {
            let encoded = encode(test);
            assert!(encoded.bytes().all(|b| is_printable(b)), "{encoded:?}");
            assert_eq!(test, decode(&encoded).unwrap());
        }
    }
}
