//! Parsers for the wire tokens this crate reads back, e.g., mailbox names echoed by the server.

use std::str::from_utf8;

use nom::{
    branch::alt,
    bytes::complete::{escaped, take_while1},
    character::complete::{char, one_of},
    combinator::{eof, map, map_res, opt},
    sequence::delimited,
    IResult,
};

use crate::utils::{
    indicators::{is_any_text_char_except_quoted_specials, is_astring_char},
    unescape_quoted,
};

/// `quoted = DQUOTE *QUOTED-CHAR DQUOTE`
///
/// Returns the unescaped content.
pub(crate) fn quoted(input: &[u8]) -> IResult<&[u8], String> {
    map(
        delimited(
            char('"'),
            map_res(
                opt(escaped(
                    take_while1(is_any_text_char_except_quoted_specials),
                    '\\',
                    one_of("\\\""),
                )),
                |val: Option<&[u8]>| from_utf8(val.unwrap_or_default()),
            ),
            char('"'),
        ),
        |val| unescape_quoted(val).into_owned(),
    )(input)
}

/// `1*ASTRING-CHAR`
pub(crate) fn atom(input: &[u8]) -> IResult<&[u8], String> {
    map(map_res(take_while1(is_astring_char), from_utf8), str::to_owned)(input)
}

/// A mailbox token as produced by [`encode_mailbox`](crate::mailbox::encode_mailbox).
///
/// Either an atom, a quoted string, or nothing at all (the empty name).
pub(crate) fn mailbox_token(input: &[u8]) -> IResult<&[u8], String> {
    alt((atom, quoted, map(eof, |_| String::new())))(input)
}

#[cfg(test)]
mod tests {
    use nom::combinator::all_consuming;

    use super::*;

    #[test]
    fn test_quoted() {
        let tests: [(&[u8], &str, &[u8]); 5] = [
            (b"\"\"", "", b""),
            (b"\"folder ABC\"", "folder ABC", b""),
            (b"\"a\\\"b\" rest", "a\"b", b" rest"),
            (b"\"a\\\\b\"", "a\\b", b""),
            (b"\"x\"\"y\"", "x", b"\"y\""),
        ];

        for (test, expected, remaining) in tests {
            let (rem, got) = quoted(test).unwrap();
            assert_eq!(expected, got);
            assert_eq!(remaining, rem);
        }
    }

    #[test]
    fn test_quoted_failures() {
        let tests: [&[u8]; 4] = [b"\"open", b"noquote", b"\"bad\\x\"", b"\"a\rb\""];

        for test in tests {
            assert!(quoted(test).is_err(), "{:?}", test);
        }
    }

    #[test]
    fn test_mailbox_token() {
        let tests: [(&[u8], &str); 5] = [
            (b"", ""),
            (b"INBOX", "INBOX"),
            (b"&bUuL1Q-", "&bUuL1Q-"),
            (b"\"folder ABC\"", "folder ABC"),
            (b"\"\"", ""),
        ];

        for (test, expected) in tests {
            let (_, got) = all_consuming(mailbox_token)(test).unwrap();
            assert_eq!(expected, got);
        }
    }

    #[test]
    fn test_mailbox_token_failures() {
        let tests: [&[u8]; 4] = [b"folder ABC", b"\"unterminated", b"a\"b", b" "];

        for test in tests {
            assert!(all_consuming(mailbox_token)(test).is_err(), "{:?}", test);
        }
    }
}
