//! Outstanding commands, keyed by tag.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use futures::channel::oneshot;

use crate::{
    command::{Command, CommandType},
    core::Tag,
    error::{CommandError, SessionError},
    session::Completion,
};

pub(crate) type Outcome = Result<Completion, CommandError>;

/// A submitted command together with the means to complete its handle.
pub(crate) struct Entry {
    command: Option<Box<dyn Command>>,
    command_type: CommandType,
    sender: Option<oneshot::Sender<Outcome>>,
    submitted: Instant,
    /// `None` if the timeout is too large to ever expire.
    deadline: Option<Instant>,
}

impl Entry {
    pub fn new(
        command: Box<dyn Command>,
        sender: oneshot::Sender<Outcome>,
        submitted: Instant,
        timeout: Duration,
    ) -> Self {
        Self {
            command_type: command.command_type(),
            command: Some(command),
            sender: Some(sender),
            submitted,
            deadline: submitted.checked_add(timeout),
        }
    }

    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    pub fn command_mut(&mut self) -> Option<&mut (dyn Command + 'static)> {
        self.command.as_deref_mut()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Clean up the command and complete the handle.
    ///
    /// `result` carries the completion text on success.
    pub fn resolve(mut self, tag: Tag, result: Result<String, CommandError>) {
        if let Some(mut command) = self.command.take() {
            command.cleanup();
        }

        let outcome = result.map(|text| Completion {
            tag,
            command_type: self.command_type,
            text,
            elapsed: self.submitted.elapsed(),
        });

        if let Some(sender) = self.sender.take() {
            // The caller may have dropped its handle.
            let _ = sender.send(outcome);
        }
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        if let Some(mut command) = self.command.take() {
            command.cleanup();
        }

        if let Some(sender) = self.sender.take() {
            let _ = sender.send(Err(CommandError::ConnectionClosed));
        }
    }
}

/// Tag to entry map plus the (at most one) entry in the middle of a literal transmission.
#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<Tag, Entry>,
    awaiting: Option<Tag>,
}

impl Registry {
    pub fn put(&mut self, tag: Tag, entry: Entry) -> Result<(), SessionError> {
        if self.entries.contains_key(&tag) {
            return Err(SessionError::DuplicateTag(tag.to_string()));
        }

        self.entries.insert(tag, entry);

        Ok(())
    }

    /// Remove the entry for `tag`.
    ///
    /// If the entry was awaiting a continuation, it no longer is.
    pub fn take(&mut self, tag: &Tag) -> Option<Entry> {
        let entry = self.entries.remove(tag)?;

        if self.awaiting.as_ref() == Some(tag) {
            self.awaiting = None;
        }

        Some(entry)
    }

    pub fn set_awaiting(&mut self, tag: Tag) {
        self.awaiting = Some(tag);
    }

    pub fn clear_awaiting(&mut self) {
        self.awaiting = None;
    }

    pub fn awaiting(&self) -> Option<&Tag> {
        self.awaiting.as_ref()
    }

    /// The entry currently awaiting a continuation request.
    pub fn awaiting_continuation(&mut self) -> Option<(&Tag, &mut Entry)> {
        let tag = self.awaiting.as_ref()?;

        self.entries.get_mut(tag).map(|entry| (tag, entry))
    }

    /// Remove and return every entry past its deadline.
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<(Tag, Entry)> {
        let expired: Vec<Tag> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(tag, _)| tag.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|tag| self.take(&tag).map(|entry| (tag, entry)))
            .collect()
    }

    pub fn drain(&mut self) -> Vec<(Tag, Entry)> {
        self.awaiting = None;
        self.entries.drain().collect()
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.entries.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use futures::executor::block_on;

    use super::*;
    use crate::error::EncodeError;

    struct Counting(Arc<AtomicUsize>);

    impl Command for Counting {
        fn command_type(&self) -> CommandType {
            CommandType::Noop
        }

        fn command_line(&mut self) -> Result<Vec<u8>, EncodeError> {
            Ok(b"NOOP\r\n".to_vec())
        }

        fn cleanup(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn entry(
        cleanups: &Arc<AtomicUsize>,
        submitted: Instant,
        timeout: Duration,
    ) -> (Entry, oneshot::Receiver<Outcome>) {
        let (sender, receiver) = oneshot::channel();

        (
            Entry::new(
                Box::new(Counting(cleanups.clone())),
                sender,
                submitted,
                timeout,
            ),
            receiver,
        )
    }

    fn tag(value: &str) -> Tag {
        Tag::try_from(value).unwrap()
    }

    #[test]
    fn test_put_and_take() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::default();
        let now = Instant::now();

        let (first, _r1) = entry(&cleanups, now, Duration::from_secs(1));
        let (second, _r2) = entry(&cleanups, now, Duration::from_secs(1));

        registry.put(tag("A1"), first).unwrap();
        assert_eq!(
            Err(SessionError::DuplicateTag(String::from("A1"))),
            registry.put(tag("A1"), second)
        );
        // The rejected entry was dropped, i.e., cleaned up.
        assert_eq!(1, cleanups.load(Ordering::SeqCst));

        assert!(registry.contains(&tag("A1")));
        assert!(registry.take(&tag("A1")).is_some());
        assert!(registry.take(&tag("A1")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_awaiting() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::default();
        let (entry, _receiver) = entry(&cleanups, Instant::now(), Duration::from_secs(1));

        registry.put(tag("A1"), entry).unwrap();
        assert!(registry.awaiting_continuation().is_none());

        registry.set_awaiting(tag("A1"));
        let (awaiting, _) = registry.awaiting_continuation().unwrap();
        assert_eq!(&tag("A1"), awaiting);

        registry.take(&tag("A1")).unwrap();
        assert_eq!(None, registry.awaiting());
    }

    #[test]
    fn test_sweep_expired() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::default();
        let now = Instant::now();

        let (short, _r1) = entry(&cleanups, now, Duration::from_millis(10));
        let (long, _r2) = entry(&cleanups, now, Duration::from_secs(60));
        registry.put(tag("A1"), short).unwrap();
        registry.put(tag("A2"), long).unwrap();
        registry.set_awaiting(tag("A1"));

        assert!(registry.sweep_expired(now).is_empty());

        let expired = registry.sweep_expired(now + Duration::from_millis(10));
        assert_eq!(1, expired.len());
        assert_eq!(tag("A1"), expired[0].0);
        assert_eq!(None, registry.awaiting());
        assert_eq!(1, registry.len());
    }

    #[test]
    fn test_unrepresentable_deadline_never_expires() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::default();
        let now = Instant::now();

        let (entry, _receiver) = entry(&cleanups, now, Duration::MAX);
        assert!(!entry.is_expired(now + Duration::from_secs(365 * 24 * 3600)));
        registry.put(tag("A1"), entry).unwrap();

        assert!(registry
            .sweep_expired(now + Duration::from_secs(365 * 24 * 3600))
            .is_empty());
        assert_eq!(1, registry.len());
    }

    #[test]
    fn test_resolve_cleans_up_once() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let (entry, receiver) = entry(&cleanups, Instant::now(), Duration::from_secs(1));

        entry.resolve(tag("A1"), Ok(String::from("done")));

        assert_eq!(1, cleanups.load(Ordering::SeqCst));
        let completion = block_on(receiver).unwrap().unwrap();
        assert_eq!(tag("A1"), completion.tag);
        assert_eq!(CommandType::Noop, completion.command_type);
        assert_eq!("done", completion.text);
    }

    #[test]
    fn test_drop_completes_with_connection_closed() {
        let cleanups = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::default();
        let (entry, receiver) = entry(&cleanups, Instant::now(), Duration::from_secs(1));
        registry.put(tag("A1"), entry).unwrap();

        drop(registry);

        assert_eq!(1, cleanups.load(Ordering::SeqCst));
        assert_eq!(
            Err(CommandError::ConnectionClosed),
            block_on(receiver).unwrap()
        );
    }
}
