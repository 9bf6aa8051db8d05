use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What [`Session::submit`](crate::session::Session::submit) does when `max_outstanding` commands
/// are already in flight.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AdmissionPolicy {
    /// Fail with [`SessionError::TooManyOutstanding`](crate::error::SessionError::TooManyOutstanding).
    #[default]
    Reject,
    /// Hold the command in the wait queue (bounded by `max_queued`) until a slot frees up.
    Queue,
}

/// Session configuration.
///
/// ```rust
/// use std::time::Duration;
///
/// use imap_pipeline::session::{AdmissionPolicy, SessionConfig};
///
/// let config = SessionConfig::default()
///     .with_command_timeout(Duration::from_secs(30))
///     .with_admission(AdmissionPolicy::Queue);
///
/// assert_eq!(config.max_outstanding, 128);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Time a command may stay unresolved (measured from submission).
    ///
    /// A timeout too large to represent as a point in time, e.g., [`Duration::MAX`], never
    /// expires.
    pub command_timeout: Duration,
    /// High-water mark of commands written but not yet completed.
    ///
    /// The session treats values below 1 as 1.
    pub max_outstanding: usize,
    /// Bound of the wait queue.
    pub max_queued: usize,
    pub admission: AdmissionPolicy,
    /// Prefix of generated tags.
    pub tag_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(60),
            max_outstanding: 128,
            max_queued: 1024,
            admission: AdmissionPolicy::Reject,
            tag_prefix: String::from("A"),
        }
    }
}

impl SessionConfig {
    /// Use [`Duration::MAX`] to disable timeouts.
    pub fn with_command_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_outstanding(mut self, max_outstanding: usize) -> Self {
        self.max_outstanding = max_outstanding.max(1);
        self
    }

    pub fn with_max_queued(mut self, max_queued: usize) -> Self {
        self.max_queued = max_queued;
        self
    }

    pub fn with_admission(mut self, admission: AdmissionPolicy) -> Self {
        self.admission = admission;
        self
    }

    pub fn with_tag_prefix(mut self, tag_prefix: impl Into<String>) -> Self {
        self.tag_prefix = tag_prefix.into();
        self
    }
}
