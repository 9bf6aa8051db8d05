//! # Server responses, as far as the session needs them.
//!
//! Parsing server output is not done here. A response parser hands already classified
//! [`Response`]s to [`Session::on_response`](crate::session::Session::on_response).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::core::{Tag, TagError};

/// Status kind.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// Successful completion of the associated command.
    Ok,
    /// Unsuccessful completion of the associated command.
    No,
    /// Protocol-level error in the client's command.
    Bad,
}

/// Continuation request (`+ ...`).
///
/// The server is ready to accept the next part of a command, e.g., the data of a synchronizing
/// literal or the next step of an authentication exchange.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ContinuationRequest {
    pub text: String,
}

impl ContinuationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Untagged data (`* ...`), forwarded as-is.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Data {
    pub raw: Vec<u8>,
}

impl Data {
    pub fn new(raw: impl Into<Vec<u8>>) -> Self {
        Self { raw: raw.into() }
    }
}

/// Tagged completion (`<tag> OK|NO|BAD <text>`).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tagged {
    pub tag: Tag,
    pub kind: StatusKind,
    pub text: String,
}

/// Response.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Response {
    Continuation(ContinuationRequest),
    Data(Data),
    Tagged(Tagged),
}

impl Response {
    pub fn continuation(text: impl Into<String>) -> Self {
        Self::Continuation(ContinuationRequest::new(text))
    }

    pub fn data(raw: impl Into<Vec<u8>>) -> Self {
        Self::Data(Data::new(raw))
    }

    pub fn tagged<T>(tag: T, kind: StatusKind, text: impl Into<String>) -> Result<Self, TagError>
    where
        T: TryInto<Tag, Error = TagError>,
    {
        Ok(Self::Tagged(Tagged {
            tag: tag.try_into()?,
            kind,
            text: text.into(),
        }))
    }

    pub fn ok<T>(tag: T, text: impl Into<String>) -> Result<Self, TagError>
    where
        T: TryInto<Tag, Error = TagError>,
    {
        Self::tagged(tag, StatusKind::Ok, text)
    }

    pub fn no<T>(tag: T, text: impl Into<String>) -> Result<Self, TagError>
    where
        T: TryInto<Tag, Error = TagError>,
    {
        Self::tagged(tag, StatusKind::No, text)
    }

    pub fn bad<T>(tag: T, text: impl Into<String>) -> Result<Self, TagError>
    where
        T: TryInto<Tag, Error = TagError>,
    {
        Self::tagged(tag, StatusKind::Bad, text)
    }
}
