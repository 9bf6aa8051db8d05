//! # Encoding of command arguments.
//!
//! Commands render themselves through an [`EncodeContext`] that records the output as a sequence of
//! [`Fragment`]s. A synchronizing literal splits a command: the client must wait for a continuation
//! request (`+ ...`) from the server before it may send the literal's data.
//!
//! [`Encoded::into_chunks`] turns the fragments into what is actually written: the first chunk up
//! to (and including) the first synchronizing literal announcement, then one chunk per
//! continuation.
//!
//! ```imap
//! C: A1 LOGIN alice {10}
//! S: + ...
//! C: Pa²²W0rD
//! ```

use std::collections::VecDeque;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::EncodeError,
    mailbox,
    utils::indicators::{is_astring_char, is_char8, is_quoted_specials, is_text_char},
};

/// Literal flavour.
///
/// A synchronizing literal (`{n}`) requires a continuation request before its data is sent.
/// A non-synchronizing literal (`{n+}`, LITERAL+, [RFC 7888]) is sent right away.
///
/// [RFC 7888]: https://www.rfc-editor.org/rfc/rfc7888
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LiteralMode {
    #[default]
    Sync,
    NonSync,
}

/// The intended action of a client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Fragment {
    /// A line that is ready to be send.
    Line { data: Vec<u8> },

    /// A literal that may require a continuation request before it should be send.
    Literal { data: Vec<u8>, mode: LiteralMode },
}

/// An encoded command (without its tag).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Encoded {
    items: VecDeque<Fragment>,
}

impl Encoded {
    /// Dump the (remaining) encoded data without being guided by [`Fragment`]s.
    pub fn dump(self) -> Vec<u8> {
        let mut out = Vec::new();

        for fragment in self.items {
            match fragment {
                Fragment::Line { mut data } => out.append(&mut data),
                Fragment::Literal { mut data, .. } => out.append(&mut data),
            }
        }

        out
    }

    /// Split the encoded data at every synchronizing literal.
    ///
    /// The first chunk is always present. Every further chunk starts with the data of a
    /// synchronizing literal and must only be send after a continuation request.
    pub fn into_chunks(self) -> VecDeque<Vec<u8>> {
        let mut chunks = VecDeque::new();
        let mut current = Vec::new();

        for fragment in self.items {
            match fragment {
                Fragment::Line { mut data } => current.append(&mut data),
                Fragment::Literal {
                    mut data,
                    mode: LiteralMode::NonSync,
                } => current.append(&mut data),
                Fragment::Literal {
                    data,
                    mode: LiteralMode::Sync,
                } => chunks.push_back(std::mem::replace(&mut current, data)),
            }
        }

        chunks.push_back(current);

        chunks
    }
}

impl Iterator for Encoded {
    type Item = Fragment;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.pop_front()
    }
}

//--------------------------------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct EncodeContext {
    accumulator: Vec<u8>,
    items: VecDeque<Fragment>,
}

impl EncodeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_all(&mut self, data: &[u8]) {
        self.accumulator.extend_from_slice(data);
    }

    pub fn push_line(&mut self) {
        self.items.push_back(Fragment::Line {
            data: std::mem::take(&mut self.accumulator),
        })
    }

    pub fn push_literal(&mut self, mode: LiteralMode) {
        self.items.push_back(Fragment::Literal {
            data: std::mem::take(&mut self.accumulator),
            mode,
        })
    }

    pub fn into_encoded(self) -> Encoded {
        let Self {
            accumulator,
            mut items,
        } = self;

        if !accumulator.is_empty() {
            items.push_back(Fragment::Line { data: accumulator });
        }

        Encoded { items }
    }
}

// ----- string types ------------------------------------------------------------------------------

/// `astring = 1*ASTRING-CHAR / string`
///
/// Picks the most compact representation: atom, quoted string, or literal (in `mode`).
pub(crate) fn astring(
    ctx: &mut EncodeContext,
    value: &[u8],
    mode: LiteralMode,
) -> Result<(), EncodeError> {
    if value.is_empty() {
        ctx.write_all(b"\"\"");
    } else if value.iter().all(|b| is_astring_char(*b)) {
        ctx.write_all(value);
    } else if value.iter().all(|b| is_text_char(*b)) {
        quoted(ctx, value);
    } else {
        literal(ctx, value, mode)?;
    }

    Ok(())
}

/// `quoted = DQUOTE *QUOTED-CHAR DQUOTE`
///
/// The caller must ensure that `value` only contains `TEXT-CHAR`s.
pub(crate) fn quoted(ctx: &mut EncodeContext, value: &[u8]) {
    let mut out = Vec::with_capacity(value.len() + 2);

    out.push(b'"');
    for byte in value {
        if is_quoted_specials(*byte) {
            out.push(b'\\');
        }
        out.push(*byte);
    }
    out.push(b'"');

    ctx.write_all(&out);
}

/// `literal = "{" number ["+"] "}" CRLF *CHAR8`
pub(crate) fn literal(
    ctx: &mut EncodeContext,
    data: &[u8],
    mode: LiteralMode,
) -> Result<(), EncodeError> {
    if let Some(position) = data.iter().position(|b| !is_char8(*b)) {
        return Err(EncodeError::ByteNotAllowed {
            found: data[position],
            position,
        });
    }

    match mode {
        LiteralMode::Sync => ctx.write_all(format!("{{{}}}\r\n", data.len()).as_bytes()),
        LiteralMode::NonSync => ctx.write_all(format!("{{{}+}}\r\n", data.len()).as_bytes()),
    }

    ctx.push_line();
    ctx.write_all(data);
    ctx.push_literal(mode);

    Ok(())
}

/// `mailbox = "INBOX" / astring`, see [`mailbox::encode_mailbox`].
pub(crate) fn mailbox(ctx: &mut EncodeContext, name: &str) {
    ctx.write_all(mailbox::encode_mailbox(name).as_bytes());
}

/// `list-mailbox = 1*list-char / string`, see [`mailbox::encode_list_mailbox`].
pub(crate) fn list_mailbox(ctx: &mut EncodeContext, pattern: &str) {
    ctx.write_all(mailbox::encode_list_mailbox(pattern).as_bytes());
}
