use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures::channel::oneshot;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{command::CommandType, core::Tag, error::CommandError, session::registry::Outcome};

/// Successful (`OK`) completion of a command.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub tag: Tag,
    pub command_type: CommandType,
    /// Human-readable text of the tagged `OK`.
    pub text: String,
    /// Time from submission to completion.
    pub elapsed: Duration,
}

/// Pending result of a submitted command.
///
/// Resolves exactly once, with the server's answer or with the reason why there will be none.
/// Dropping the handle does not cancel the command, use
/// [`Session::cancel`](crate::session::Session::cancel) for that.
#[derive(Debug)]
pub struct CommandHandle {
    tag: Tag,
    command_type: CommandType,
    receiver: oneshot::Receiver<Outcome>,
}

impl CommandHandle {
    pub(crate) fn new(
        tag: Tag,
        command_type: CommandType,
        receiver: oneshot::Receiver<Outcome>,
    ) -> Self {
        Self {
            tag,
            command_type,
            receiver,
        }
    }

    /// The tag assigned to the command.
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    /// The outcome, if the command is already resolved.
    pub fn try_outcome(&mut self) -> Option<Result<Completion, CommandError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Some(Err(CommandError::ConnectionClosed)),
        }
    }
}

impl Future for CommandHandle {
    type Output = Result<Completion, CommandError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(CommandError::ConnectionClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}
