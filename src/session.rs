//! # Session engine
//!
//! A [`Session`] multiplexes many commands over one connection. Every submitted command gets a
//! fresh tag, is written immediately (or held in a wait queue), and its [`CommandHandle`] resolves
//! once the tagged completion with the same tag arrives, in whatever order the server answers.
//!
//! The session does no I/O on its own. Bytes go out through a [`Transport`], parsed responses
//! come in through [`Session::on_response`].
//!
//! ```rust
//! use futures::{channel::mpsc, executor::block_on};
//! use imap_pipeline::{
//!     command::SubscribeFolder,
//!     response::Response,
//!     session::{Session, SessionConfig},
//! };
//!
//! let (wire, mut outgoing) = mpsc::unbounded::<Vec<u8>>();
//! let (session, _unsolicited) = Session::new(wire, SessionConfig::default()).unwrap();
//!
//! let handle = session.submit(SubscribeFolder::new("测试")).unwrap();
//! assert_eq!(outgoing.try_next().unwrap().unwrap(), b"A1 SUBSCRIBE &bUuL1Q-\r\n");
//!
//! session.on_response(Response::ok("A1", "SUBSCRIBE completed").unwrap()).unwrap();
//! assert_eq!(block_on(handle).unwrap().text, "SUBSCRIBE completed");
//! ```

mod config;
mod handle;
mod registry;

use std::{
    collections::{HashSet, VecDeque},
    fmt::{Debug, Formatter},
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use futures::channel::{mpsc, oneshot};
use log::{debug, trace, warn};

pub use self::{
    config::{AdmissionPolicy, SessionConfig},
    handle::{CommandHandle, Completion},
};
use self::registry::{Entry, Registry};
use crate::{
    command::Command,
    core::{Tag, TagGenerator},
    error::{CommandError, SessionError},
    response::{ContinuationRequest, Data, Response, Tagged},
    secret::Secret,
    utils::escape_byte_string,
};

/// Where the session writes its bytes.
///
/// `write` is called while the session holds its lock, so that the order on the wire equals the
/// order of registration. It must hand the bytes off (e.g., into a channel) instead of blocking.
pub trait Transport: Send + Sync {
    fn write(&self, data: Vec<u8>) -> io::Result<()>;
}

impl Transport for mpsc::UnboundedSender<Vec<u8>> {
    fn write(&self, data: Vec<u8>) -> io::Result<()> {
        self.unbounded_send(data)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "writer is gone"))
    }
}

/// Observable state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Nothing outstanding.
    Idle,
    /// Commands are outstanding or queued.
    Active,
    /// A command is in the middle of a literal and waits for a continuation request.
    AwaitingContinuation,
    /// The connection is gone. Every submission fails.
    Closed,
}

/// A command that was accepted but not written yet.
struct Queued {
    tag: Tag,
    entry: Entry,
    line: Secret<Vec<u8>>,
}

/// Resolutions are collected under the lock and run after it was released.
type Resolution = (Tag, Entry, Result<String, CommandError>);

struct Inner {
    closed: bool,
    registry: Registry,
    queue: VecDeque<Queued>,
    tags: TagGenerator,
    /// Command that was resolved while the server still waited for its literal.
    abandoned: Option<Tag>,
    /// Tags resolved locally (cancel, timeout) whose completion may still arrive.
    ///
    /// A tombstone is only removed by that completion or by closing the session.
    tombstones: HashSet<Tag>,
}

impl Inner {
    fn can_write(&self, config: &SessionConfig) -> bool {
        self.registry.awaiting().is_none()
            && self.abandoned.is_none()
            && self.registry.len() < config.max_outstanding
    }

    /// Remember a locally resolved tag, its completion may still arrive.
    fn bury(&mut self, tag: Tag, was_awaiting: bool) {
        if was_awaiting {
            self.abandoned = Some(tag.clone());
        }

        self.tombstones.insert(tag);
    }

    /// Remove a tag from the tombstones, returns whether it was there.
    fn exhume(&mut self, tag: &Tag) -> bool {
        let buried = self.tombstones.remove(tag);

        if self.abandoned.as_ref() == Some(tag) {
            self.abandoned = None;
            return true;
        }

        buried
    }

    fn state(&self) -> SessionState {
        if self.closed {
            SessionState::Closed
        } else if self.registry.awaiting().is_some() {
            SessionState::AwaitingContinuation
        } else if self.registry.is_empty() && self.queue.is_empty() && self.abandoned.is_none() {
            SessionState::Idle
        } else {
            SessionState::Active
        }
    }
}

/// Tag-correlating command pipeline for one connection.
///
/// Cheap to clone, all clones share the same state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
    transport: Arc<dyn Transport>,
    config: Arc<SessionConfig>,
    unsolicited: mpsc::UnboundedSender<Data>,
}

impl Session {
    /// Create a session writing to `transport`.
    ///
    /// Untagged data is forwarded to the returned receiver.
    pub fn new<T>(
        transport: T,
        mut config: SessionConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Data>), SessionError>
    where
        T: Transport + 'static,
    {
        // Public fields (and deserialization) bypass `with_max_outstanding`.
        config.max_outstanding = config.max_outstanding.max(1);

        let tags = TagGenerator::new(config.tag_prefix.clone())?;
        let (unsolicited, receiver) = mpsc::unbounded();

        let inner = Inner {
            closed: false,
            registry: Registry::default(),
            queue: VecDeque::new(),
            tags,
            abandoned: None,
            tombstones: HashSet::new(),
        };

        let session = Self {
            inner: Arc::new(Mutex::new(inner)),
            transport: Arc::new(transport),
            config: Arc::new(config),
            unsolicited,
        };

        Ok((session, receiver))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Submit a command.
    ///
    /// Returns as soon as the command is written or queued. Encoding and admission errors are
    /// returned here and the command never reaches the wire (but is cleaned up).
    pub fn submit<C>(&self, command: C) -> Result<CommandHandle, SessionError>
    where
        C: Command + 'static,
    {
        self.submit_boxed(Box::new(command))
    }

    /// Submit a boxed command, see [`Session::submit`].
    pub fn submit_boxed(
        &self,
        mut command: Box<dyn Command>,
    ) -> Result<CommandHandle, SessionError> {
        let now = Instant::now();
        let mut resolutions = Vec::new();

        let result = {
            let mut inner = self.lock();
            self.sweep_locked(&mut inner, now, &mut resolutions);

            match self.admit(&inner) {
                Ok(write_now) => match command.command_line() {
                    Ok(line) => self.register(&mut inner, command, line, write_now, now),
                    Err(error) => {
                        command.cleanup();
                        Err(SessionError::Encode(error))
                    }
                },
                Err(error) => {
                    command.cleanup();
                    Err(error)
                }
            }
        };

        resolve_all(resolutions);

        result
    }

    /// Decide whether a new command may be written right away (`true`) or has to be queued.
    fn admit(&self, inner: &Inner) -> Result<bool, SessionError> {
        let config = &self.config;

        if inner.closed {
            return Err(SessionError::Closed);
        }

        if config.admission == AdmissionPolicy::Reject
            && inner.registry.len() + inner.queue.len() >= config.max_outstanding
        {
            return Err(SessionError::TooManyOutstanding {
                limit: config.max_outstanding,
            });
        }

        let write_now = inner.queue.is_empty() && inner.can_write(config);

        if !write_now && inner.queue.len() >= config.max_queued {
            return Err(SessionError::QueueFull {
                limit: config.max_queued,
            });
        }

        Ok(write_now)
    }

    fn register(
        &self,
        inner: &mut Inner,
        command: Box<dyn Command>,
        line: Vec<u8>,
        write_now: bool,
        now: Instant,
    ) -> Result<CommandHandle, SessionError> {
        let Inner {
            registry,
            queue,
            tags,
            abandoned,
            tombstones,
            ..
        } = &mut *inner;
        let tag = tags.generate_unused(|tag| {
            registry.contains(tag)
                || queue.iter().any(|queued| &queued.tag == tag)
                || tombstones.contains(tag)
                || abandoned.as_ref() == Some(tag)
        });

        let command_type = command.command_type();
        let (sender, receiver) = oneshot::channel();
        let entry = Entry::new(command, sender, now, self.config.command_timeout);
        let line = Secret::new(line);

        if write_now {
            self.write_entry(inner, tag.clone(), entry, line)
                .map_err(|(error, _, _)| SessionError::Transport(error.to_string()))?;
        } else {
            debug!("{tag} {command_type} queued");
            inner.queue.push_back(Queued {
                tag: tag.clone(),
                entry,
                line,
            });
        }

        Ok(CommandHandle::new(tag, command_type, receiver))
    }

    /// Write `tag SP line` and register the entry.
    ///
    /// On failure, the entry is handed back together with the error.
    fn write_entry(
        &self,
        inner: &mut Inner,
        tag: Tag,
        mut entry: Entry,
        line: Secret<Vec<u8>>,
    ) -> Result<(), (io::Error, Tag, Entry)> {
        let (sensitive, debug_data, awaits_continuation) = match entry.command_mut() {
            Some(command) => (
                command.is_sensitive(),
                command.debug_data(),
                command.has_next_continuation(),
            ),
            None => (false, None, false),
        };

        let mut data = Vec::with_capacity(tag.inner().len() + 1 + line.declassify().len());
        data.extend_from_slice(tag.inner().as_bytes());
        data.push(b' ');
        data.extend_from_slice(line.declassify());

        if sensitive {
            trace!(
                "C: {tag} {}",
                debug_data.unwrap_or_else(|| String::from("/* REDACTED */"))
            );
        } else {
            trace!("C: {}", escape_byte_string(&data));
        }

        if let Err(error) = self.transport.write(data) {
            warn!("{tag} could not be written: {error}");
            return Err((error, tag, entry));
        }

        debug!("{tag} {} submitted", entry.command_type());

        if awaits_continuation {
            inner.registry.set_awaiting(tag.clone());
        }

        if let Err(error) = inner.registry.put(tag.clone(), entry) {
            // Tags are generated unused, so this is unreachable in practice.
            warn!("{tag} could not be registered: {error}");
        }

        Ok(())
    }

    /// Write queued commands for as long as nothing blocks.
    fn pump(&self, inner: &mut Inner, resolutions: &mut Vec<Resolution>) {
        while inner.can_write(&self.config) {
            let Some(Queued { tag, entry, line }) = inner.queue.pop_front() else {
                break;
            };

            if let Err((error, tag, entry)) = self.write_entry(inner, tag, entry, line) {
                resolutions.push((tag, entry, Err(CommandError::Transport(error.to_string()))));
            }
        }
    }

    fn sweep_locked(&self, inner: &mut Inner, now: Instant, resolutions: &mut Vec<Resolution>) {
        if inner.closed {
            return;
        }

        let awaiting = inner.registry.awaiting().cloned();

        for (tag, entry) in inner.registry.sweep_expired(now) {
            warn!("{tag} {} timed out", entry.command_type());

            inner.bury(tag.clone(), awaiting.as_ref() == Some(&tag));
            resolutions.push((tag, entry, Err(CommandError::Timeout)));
        }

        let mut index = 0;
        while index < inner.queue.len() {
            if inner.queue[index].entry.is_expired(now) {
                if let Some(Queued { tag, entry, .. }) = inner.queue.remove(index) {
                    warn!("{tag} {} timed out while queued", entry.command_type());
                    resolutions.push((tag, entry, Err(CommandError::Timeout)));
                }
            } else {
                index += 1;
            }
        }

        self.pump(inner, resolutions);
    }

    /// Resolve every command whose deadline is reached with [`CommandError::Timeout`].
    ///
    /// The connection stays open. Returns the number of resolved commands.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let mut resolutions = Vec::new();

        {
            let mut inner = self.lock();
            self.sweep_locked(&mut inner, now, &mut resolutions);
        }

        let count = resolutions
            .iter()
            .filter(|(_, _, result)| matches!(result, Err(CommandError::Timeout)))
            .count();

        resolve_all(resolutions);

        count
    }

    /// Feed a parsed server response into the session.
    ///
    /// Errors for which [`SessionError::is_protocol_violation`] holds leave the session untouched;
    /// the caller is expected to give up on the connection, e.g., via [`Session::fail`].
    pub fn on_response(&self, response: Response) -> Result<(), SessionError> {
        match response {
            Response::Continuation(request) => self.on_continuation(&request),
            Response::Data(data) => {
                if self.lock().closed {
                    return Err(SessionError::Closed);
                }

                if self.unsolicited.unbounded_send(data).is_err() {
                    trace!("Untagged data dropped, nobody listens");
                }

                Ok(())
            }
            Response::Tagged(tagged) => self.on_tagged(tagged),
        }
    }

    fn on_continuation(&self, request: &ContinuationRequest) -> Result<(), SessionError> {
        let mut resolutions = Vec::new();

        let result = {
            let mut inner = self.lock();
            let inner = &mut *inner;

            if inner.closed {
                return Err(SessionError::Closed);
            }

            match inner.registry.awaiting_continuation() {
                Some((tag, entry)) => {
                    let tag = tag.clone();
                    let (chunk, more, sensitive) = match entry.command_mut() {
                        Some(command) => {
                            let chunk = command.next_continuation_line(request);
                            (
                                chunk,
                                command.has_next_continuation(),
                                command.is_sensitive(),
                            )
                        }
                        None => (None, false, false),
                    };

                    match chunk {
                        Some(chunk) => {
                            if sensitive {
                                trace!("C: /* {} bytes of {tag} */", chunk.len());
                            } else {
                                trace!("C: {}", escape_byte_string(&chunk));
                            }

                            if let Err(error) = self.transport.write(chunk) {
                                warn!("{tag} could not be written: {error}");
                                if let Some(entry) = inner.registry.take(&tag) {
                                    resolutions.push((
                                        tag,
                                        entry,
                                        Err(CommandError::Transport(error.to_string())),
                                    ));
                                }
                            } else if !more {
                                inner.registry.clear_awaiting();
                            }

                            self.pump(inner, &mut resolutions);
                            Ok(())
                        }
                        None => {
                            inner.registry.clear_awaiting();
                            warn!("Continuation request, but {tag} has nothing left to send");
                            Err(SessionError::UnexpectedContinuation)
                        }
                    }
                }
                None => match &inner.abandoned {
                    Some(tag) => {
                        warn!("Continuation request for abandoned command {tag}");
                        Err(SessionError::AbandonedContinuation(tag.to_string()))
                    }
                    None => {
                        warn!("Continuation request, but no command awaits one");
                        Err(SessionError::UnexpectedContinuation)
                    }
                },
            }
        };

        resolve_all(resolutions);

        result
    }

    fn on_tagged(&self, tagged: Tagged) -> Result<(), SessionError> {
        let Tagged { tag, kind, text } = tagged;
        let mut resolutions = Vec::new();

        let result = {
            let mut inner = self.lock();
            let inner = &mut *inner;

            if inner.closed {
                return Err(SessionError::Closed);
            }

            if let Some(entry) = inner.registry.take(&tag) {
                debug!("{tag} {} completed with {kind:?}", entry.command_type());

                let result = match CommandError::from_status(kind, text.clone()) {
                    None => Ok(text),
                    Some(error) => Err(error),
                };
                resolutions.push((tag, entry, result));

                self.pump(inner, &mut resolutions);
                Ok(())
            } else if inner.exhume(&tag) {
                debug!("{tag} completed with {kind:?} after it was resolved, dropped");

                self.pump(inner, &mut resolutions);
                Ok(())
            } else {
                warn!("Completion for unknown tag {tag}");
                Err(SessionError::UnexpectedTag(tag.to_string()))
            }
        };

        resolve_all(resolutions);

        result
    }

    /// Cancel the command tagged `tag`.
    ///
    /// Its handle resolves with [`CommandError::Cancelled`] right away. Bytes already written are
    /// not taken back, a late completion from the server is dropped silently. Returns `false` if
    /// there is nothing to cancel.
    pub fn cancel(&self, tag: &Tag) -> bool {
        let mut resolutions = Vec::new();

        let cancelled = {
            let mut inner = self.lock();
            let inner = &mut *inner;

            let was_awaiting = inner.registry.awaiting() == Some(tag);

            if let Some(entry) = inner.registry.take(tag) {
                debug!("{tag} {} cancelled", entry.command_type());
                inner.bury(tag.clone(), was_awaiting);
                resolutions.push((tag.clone(), entry, Err(CommandError::Cancelled)));

                self.pump(inner, &mut resolutions);
                true
            } else if let Some(position) = inner.queue.iter().position(|queued| &queued.tag == tag)
            {
                if let Some(Queued { tag, entry, .. }) = inner.queue.remove(position) {
                    debug!("{tag} {} cancelled while queued", entry.command_type());
                    resolutions.push((tag, entry, Err(CommandError::Cancelled)));
                }
                true
            } else {
                false
            }
        };

        resolve_all(resolutions);

        cancelled
    }

    /// The connection is gone, resolve everything with [`CommandError::ConnectionClosed`].
    ///
    /// Every later submission fails with [`SessionError::Closed`]. Idempotent.
    pub fn on_connection_closed(&self) {
        self.close(CommandError::ConnectionClosed)
    }

    /// Give up on the connection, e.g., after a protocol violation.
    ///
    /// Like [`Session::on_connection_closed`], but resolves with
    /// [`CommandError::ConnectionFailed`].
    pub fn fail(&self, reason: impl Into<String>) {
        self.close(CommandError::ConnectionFailed(reason.into()))
    }

    fn close(&self, error: CommandError) {
        let mut resolutions = Vec::new();

        {
            let mut inner = self.lock();

            if inner.closed {
                return;
            }

            debug!("Session closed ({error})");

            inner.closed = true;
            inner.abandoned = None;
            inner.tombstones.clear();

            for (tag, entry) in inner.registry.drain() {
                resolutions.push((tag, entry, Err(error.clone())));
            }

            for Queued { tag, entry, .. } in inner.queue.drain(..) {
                resolutions.push((tag, entry, Err(error.clone())));
            }
        }

        resolve_all(resolutions);
    }

    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    /// Number of commands written but not completed.
    pub fn outstanding(&self) -> usize {
        self.lock().registry.len()
    }

    /// Number of commands waiting to be written.
    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn resolve_all(resolutions: Vec<Resolution>) {
    for (tag, entry, result) in resolutions {
        entry.resolve(tag, result);
    }
}
