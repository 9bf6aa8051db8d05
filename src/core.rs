//! Tags and tag generation.

use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::indicators::is_astring_char;

/// A tag.
///
/// Every command is prefixed by a tag and the server echoes it in the command's completion.
///
/// ```abnf
/// tag = 1*<any ASTRING-CHAR except "+">
/// ```
///
/// Tags are only unique among the commands currently outstanding on one connection, see
/// [`TagGenerator`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String"))]
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    pub fn verify(value: impl AsRef<[u8]>) -> Result<(), TagError> {
        let value = value.as_ref();

        if value.is_empty() {
            return Err(TagError::Empty);
        }

        if let Some(position) = value
            .iter()
            .position(|b| !is_astring_char(*b) || *b == b'+')
        {
            return Err(TagError::ByteNotAllowed {
                found: value[position],
                position,
            });
        };

        Ok(())
    }

    pub fn inner(&self) -> &str {
        self.0.as_ref()
    }
}

impl TryFrom<&str> for Tag {
    type Error = TagError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::verify(value)?;

        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for Tag {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::verify(&value)?;

        Ok(Self(value))
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
pub enum TagError {
    #[error("Must not be empty.")]
    Empty,
    #[error("Invalid byte b'\\x{found:02x}' at index {position}")]
    ByteNotAllowed { found: u8, position: usize },
}

/// Source of tags for one connection.
///
/// Produces `<prefix><counter>`, e.g., `A1`, `A2`, .... The counter wraps around, so the session
/// still checks every generated tag against the tags it currently tracks.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    prefix: String,
    counter: u64,
}

impl TagGenerator {
    /// Create a generator using `prefix`.
    ///
    /// An empty prefix is fine, the counter alone is a valid tag.
    pub fn new(prefix: impl Into<String>) -> Result<Self, TagError> {
        let prefix = prefix.into();

        if !prefix.is_empty() {
            Tag::verify(&prefix)?;
        }

        Ok(Self { prefix, counter: 1 })
    }

    /// Generate the next tag.
    pub fn generate(&mut self) -> Tag {
        let tag = Tag(format!("{}{}", self.prefix, self.counter));
        self.counter = self.counter.wrapping_add(1);

        tag
    }

    /// Generate the next tag that is not `in_use`.
    pub fn generate_unused<F>(&mut self, in_use: F) -> Tag
    where
        F: Fn(&Tag) -> bool,
    {
        loop {
            let tag = self.generate();

            if !in_use(&tag) {
                return tag;
            }
        }
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self {
            prefix: String::from("A"),
            counter: 1,
        }
    }
}
