//! Error-related types.

use thiserror::Error;

use crate::{core::TagError, response::StatusKind};

/// An argument could not be rendered into IMAP syntax.
///
/// Returned synchronously by [`Command::command_line`](crate::command::Command::command_line)
/// and [`Session::submit`](crate::session::Session::submit). Nothing is written to the wire.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum EncodeError {
    #[error("Must not be empty")]
    Empty,
    #[error("Byte b'\\x{found:02x}' at index {position} can not be represented")]
    ByteNotAllowed { found: u8, position: usize },
    #[error("Command was already cleaned up")]
    Cleared,
}

/// A wire token (or a modified UTF-7 string) could not be decoded.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum DecodeError {
    #[error("Malformed mailbox token")]
    Token,
    #[error("Non-ASCII byte at index {0}")]
    NonAscii(usize),
    #[error("Unterminated modified BASE64 at index {0}")]
    Unterminated(usize),
    #[error("Invalid modified BASE64 at index {0}")]
    Base64(usize),
    #[error("Odd number of bytes in UTF-16 at index {0}")]
    Utf16Length(usize),
    #[error("Invalid UTF-16")]
    Utf16,
}

/// Error returned by a [`Session`](crate::session::Session) operation.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error("Session is closed")]
    Closed,
    #[error("Too many outstanding commands (limit is {limit})")]
    TooManyOutstanding { limit: usize },
    #[error("Wait queue is full (limit is {limit})")]
    QueueFull { limit: usize },
    #[error("Tag `{0}` is already outstanding")]
    DuplicateTag(String),
    #[error("Received completion for unknown tag `{0}`")]
    UnexpectedTag(String),
    #[error("Received continuation request while no command awaits one")]
    UnexpectedContinuation,
    #[error("Received continuation request for abandoned command `{0}`")]
    AbandonedContinuation(String),
    #[error("Transport failed: {0}")]
    Transport(String),
}

impl SessionError {
    /// Whether this error means the server violated the protocol (or the wire is unrecoverable).
    ///
    /// The connection must not be used any further after such an error.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            SessionError::UnexpectedTag(_)
                | SessionError::UnexpectedContinuation
                | SessionError::AbandonedContinuation(_)
        )
    }
}

/// Outcome of a command that did not complete with `OK`.
///
/// Delivered through a [`CommandHandle`](crate::session::CommandHandle).
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum CommandError {
    #[error("Server answered NO: {0}")]
    No(String),
    #[error("Server answered BAD: {0}")]
    Bad(String),
    #[error("Command timed out")]
    Timeout,
    #[error("Command was cancelled")]
    Cancelled,
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Transport failed: {0}")]
    Transport(String),
}

impl CommandError {
    pub(crate) fn from_status(kind: StatusKind, text: String) -> Option<Self> {
        match kind {
            StatusKind::Ok => None,
            StatusKind::No => Some(CommandError::No(text)),
            StatusKind::Bad => Some(CommandError::Bad(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_violations() {
        let tests = [
            (SessionError::UnexpectedTag("A1".into()), true),
            (SessionError::UnexpectedContinuation, true),
            (SessionError::AbandonedContinuation("A1".into()), true),
            (SessionError::Closed, false),
            (SessionError::TooManyOutstanding { limit: 1 }, false),
            (SessionError::Encode(EncodeError::Empty), false),
        ];

        for (test, expected) in tests {
            assert_eq!(expected, test.is_protocol_violation(), "{test:?}");
        }
    }

    #[test]
    fn test_command_error_from_status() {
        assert_eq!(None, CommandError::from_status(StatusKind::Ok, "done".into()));
        assert_eq!(
            Some(CommandError::No("nope".into())),
            CommandError::from_status(StatusKind::No, "nope".into())
        );
        assert_eq!(
            Some(CommandError::Bad("huh".into())),
            CommandError::from_status(StatusKind::Bad, "huh".into())
        );
    }
}
