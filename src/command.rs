//! # Commands
//!
//! Every command the session can submit implements [`Command`]. A command knows its
//! [`CommandType`], renders its first wire line (without the tag), hands out further chunks when
//! the server asks for them, and clears its arguments when the session is done with it.
//!
//! ```rust
//! use imap_pipeline::command::{Command, CommandType, SubscribeFolder};
//!
//! let mut command = SubscribeFolder::new("测试");
//!
//! assert_eq!(command.command_type(), CommandType::Subscribe);
//! assert_eq!(command.command_line().unwrap(), b"SUBSCRIBE &bUuL1Q-\r\n");
//!
//! command.cleanup();
//! assert!(command.command_line().is_err());
//! ```

mod append;
mod auth;
mod mailbox;

use std::{
    collections::VecDeque,
    fmt::{Display, Formatter},
};

pub use append::Append;
pub use auth::{AuthenticatePlain, Login};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use self::mailbox::{
    CreateFolder, DeleteFolder, ExamineFolder, ListFolders, RenameFolder, SelectFolder, Status,
    StatusItem, SubscribeFolder, UnsubscribeFolder,
};
use crate::{codec::Encoded, error::EncodeError, response::ContinuationRequest, secret::Wipe};

/// The kind of a command.
///
/// Fixed for the lifetime of a command, it survives [`Command::cleanup`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Capability,
    Noop,
    Logout,
    Check,
    Close,
    Expunge,
    Login,
    Authenticate,
    Select,
    Examine,
    Create,
    Delete,
    Rename,
    Subscribe,
    Unsubscribe,
    List,
    Lsub,
    Status,
    Append,
}

impl CommandType {
    /// The command name as written on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::Check => "CHECK",
            Self::Close => "CLOSE",
            Self::Expunge => "EXPUNGE",
            Self::Login => "LOGIN",
            Self::Authenticate => "AUTHENTICATE",
            Self::Select => "SELECT",
            Self::Examine => "EXAMINE",
            Self::Create => "CREATE",
            Self::Delete => "DELETE",
            Self::Rename => "RENAME",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::List => "LIST",
            Self::Lsub => "LSUB",
            Self::Status => "STATUS",
            Self::Append => "APPEND",
        }
    }
}

impl Display for CommandType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A command that can be submitted to a [`Session`](crate::session::Session).
///
/// The session calls [`Command::command_line`] once, prefixes the result with a tag, and writes
/// it. While [`Command::has_next_continuation`] reports `true`, every continuation request from the
/// server is answered with [`Command::next_continuation_line`]. Once the command is resolved (in
/// whatever way), the session calls [`Command::cleanup`] exactly once and drops the command.
pub trait Command: Send {
    /// The (fixed) kind of this command.
    fn command_type(&self) -> CommandType;

    /// Encode the first wire line without tag, terminated by CRLF.
    ///
    /// Encoding is deterministic: calling this again yields the same bytes and resets the
    /// pending continuation chunks. Fails after [`Command::cleanup`].
    fn command_line(&mut self) -> Result<Vec<u8>, EncodeError>;

    /// Whether the command still has a chunk to send after a continuation request.
    fn has_next_continuation(&self) -> bool {
        false
    }

    /// The next chunk to send in reply to `request`.
    fn next_continuation_line(&mut self, request: &ContinuationRequest) -> Option<Vec<u8>> {
        let _ = request;

        None
    }

    /// Whether the wire bytes of this command must not appear in logs.
    fn is_sensitive(&self) -> bool {
        false
    }

    /// A description of the command that is safe to log, if the command wants to provide one.
    fn debug_data(&self) -> Option<String> {
        None
    }

    /// Clear every argument and buffered chunk. Idempotent.
    fn cleanup(&mut self);
}

impl<C: Command + ?Sized> Command for Box<C> {
    fn command_type(&self) -> CommandType {
        (**self).command_type()
    }

    fn command_line(&mut self) -> Result<Vec<u8>, EncodeError> {
        (**self).command_line()
    }

    fn has_next_continuation(&self) -> bool {
        (**self).has_next_continuation()
    }

    fn next_continuation_line(&mut self, request: &ContinuationRequest) -> Option<Vec<u8>> {
        (**self).next_continuation_line(request)
    }

    fn is_sensitive(&self) -> bool {
        (**self).is_sensitive()
    }

    fn debug_data(&self) -> Option<String> {
        (**self).debug_data()
    }

    fn cleanup(&mut self) {
        (**self).cleanup()
    }
}

/// Commands without arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    command_type: CommandType,
    cleared: bool,
}

impl SimpleCommand {
    fn new(command_type: CommandType) -> Self {
        Self {
            command_type,
            cleared: false,
        }
    }

    pub fn capability() -> Self {
        Self::new(CommandType::Capability)
    }

    pub fn noop() -> Self {
        Self::new(CommandType::Noop)
    }

    pub fn logout() -> Self {
        Self::new(CommandType::Logout)
    }

    pub fn check() -> Self {
        Self::new(CommandType::Check)
    }

    pub fn close() -> Self {
        Self::new(CommandType::Close)
    }

    pub fn expunge() -> Self {
        Self::new(CommandType::Expunge)
    }
}

impl Command for SimpleCommand {
    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn command_line(&mut self) -> Result<Vec<u8>, EncodeError> {
        if self.cleared {
            return Err(EncodeError::Cleared);
        }

        Ok(format!("{}\r\n", self.command_type.name()).into_bytes())
    }

    fn cleanup(&mut self) {
        self.cleared = true;
    }
}

/// Chunks of a command that wait for continuation requests.
///
/// Chunks may hold literal data (e.g., a password), so they are wiped when discarded.
#[derive(Debug, Default)]
pub(crate) struct Continuations {
    chunks: VecDeque<Vec<u8>>,
}

impl Continuations {
    /// Take the first chunk of `encoded` and keep the rest.
    pub fn split_off_first(&mut self, encoded: Encoded) -> Vec<u8> {
        self.clear();

        let mut chunks = encoded.into_chunks();
        let first = chunks.pop_front().unwrap_or_default();
        self.chunks = chunks;

        first
    }

    /// Keep a single chunk to send after the first continuation request.
    pub fn push(&mut self, chunk: Vec<u8>) {
        self.chunks.push_back(chunk);
    }

    pub fn has_next(&self) -> bool {
        !self.chunks.is_empty()
    }

    pub fn next(&mut self) -> Option<Vec<u8>> {
        self.chunks.pop_front()
    }

    pub fn clear(&mut self) {
        for chunk in self.chunks.iter_mut() {
            chunk.wipe();
        }
        self.chunks.clear();
    }
}

impl Drop for Continuations {
    fn drop(&mut self) {
        self.clear();
    }
}
