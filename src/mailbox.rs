//! Mailbox (folder) names on the wire.
//!
//! A name is first transcoded into modified UTF-7 (see [`utf7`](crate::utf7)) and then quoted
//! when it contains anything besides `ASTRING-CHAR`s.
//!
//! ```rust
//! use imap_pipeline::mailbox::{decode_mailbox, encode_mailbox};
//!
//! assert_eq!(encode_mailbox("folderABC"), "folderABC");
//! assert_eq!(encode_mailbox("folder ABC"), "\"folder ABC\"");
//! assert_eq!(encode_mailbox("测试"), "&bUuL1Q-");
//!
//! assert_eq!(decode_mailbox("\"folder ABC\"").unwrap(), "folder ABC");
//! ```

use std::borrow::Cow;

use nom::combinator::all_consuming;

use crate::{
    codec::decode::mailbox_token,
    error::DecodeError,
    utf7,
    utils::{
        escape_quoted,
        indicators::{is_astring_char, is_list_char},
    },
};

/// Encode a mailbox name into its wire token.
///
/// The empty name yields the empty token.
pub fn encode_mailbox(name: &str) -> Cow<str> {
    match utf7::encode(name) {
        Cow::Borrowed(encoded) => quote_if_needed(encoded, is_astring_char),
        Cow::Owned(encoded) => Cow::Owned(quote_if_needed(&encoded, is_astring_char).into_owned()),
    }
}

/// Encode a `LIST`/`LSUB` argument (reference or pattern).
///
/// Unlike [`encode_mailbox`], the wildcards `%` and `*` are kept unquoted and the empty string
/// is sent as `""`, as the protocol requires an argument here.
pub fn encode_list_mailbox(pattern: &str) -> Cow<str> {
    if pattern.is_empty() {
        return Cow::Borrowed("\"\"");
    }

    match utf7::encode(pattern) {
        Cow::Borrowed(encoded) => quote_if_needed(encoded, is_list_char),
        Cow::Owned(encoded) => Cow::Owned(quote_if_needed(&encoded, is_list_char).into_owned()),
    }
}

/// Decode a wire token (atom, quoted string, or empty) back into a mailbox name.
pub fn decode_mailbox(token: &str) -> Result<String, DecodeError> {
    let (_, raw) =
        all_consuming(mailbox_token)(token.as_bytes()).map_err(|_| DecodeError::Token)?;

    utf7::decode(&raw).map(Cow::into_owned)
}

/// `encoded` is 7-bit printable, so quoting always works.
fn quote_if_needed(encoded: &str, is_plain: fn(u8) -> bool) -> Cow<str> {
    if encoded.bytes().all(is_plain) {
        Cow::Borrowed(encoded)
    } else {
        Cow::Owned(format!("\"{}\"", escape_quoted(encoded)))
    }
}
