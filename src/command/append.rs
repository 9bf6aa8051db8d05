use chrono::{DateTime, FixedOffset};

use crate::{
    codec::{
        encode::{self, EncodeContext},
        LiteralMode,
    },
    command::{Command, CommandType, Continuations},
    error::EncodeError,
    response::ContinuationRequest,
    secret::Secret,
    utils::indicators::is_atom_char,
};

/// `append = "APPEND" SP mailbox [SP flag-list] [SP date-time] SP literal`
///
/// The message is always sent as a literal. A synchronizing literal waits for the server's
/// continuation request, a non-synchronizing one (`LITERAL+`) is sent right away.
///
/// ```imap
/// C: A1 APPEND Drafts (\Seen) {5}
/// S: + Ready for literal data
/// C: Hello
/// S: A1 OK APPEND completed
/// ```
#[derive(Debug)]
pub struct Append {
    folder_name: Option<String>,
    flags: Vec<String>,
    date: Option<DateTime<FixedOffset>>,
    message: Option<Secret<Vec<u8>>>,
    literal_mode: LiteralMode,
    pending: Continuations,
}

impl Append {
    pub fn new(folder_name: impl Into<String>, message: impl Into<Vec<u8>>) -> Self {
        Self {
            folder_name: Some(folder_name.into()),
            flags: Vec::new(),
            date: None,
            message: Some(Secret::new(message.into())),
            literal_mode: LiteralMode::Sync,
            pending: Continuations::default(),
        }
    }

    /// Set flags, e.g., `\Seen` or a keyword such as `$Forwarded`.
    pub fn with_flags<I, F>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the internal date of the appended message.
    pub fn with_date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_literal_mode(mut self, literal_mode: LiteralMode) -> Self {
        self.literal_mode = literal_mode;
        self
    }
}

/// `flag = "\" atom / atom`
fn verify_flag(flag: &str) -> Result<(), EncodeError> {
    let atom = flag.strip_prefix('\\').unwrap_or(flag);

    if atom.is_empty() {
        return Err(EncodeError::Empty);
    }

    let offset = flag.len() - atom.len();
    if let Some(position) = atom.bytes().position(|b| !is_atom_char(b)) {
        return Err(EncodeError::ByteNotAllowed {
            found: atom.as_bytes()[position],
            position: offset + position,
        });
    }

    Ok(())
}

impl Command for Append {
    fn command_type(&self) -> CommandType {
        CommandType::Append
    }

    fn command_line(&mut self) -> Result<Vec<u8>, EncodeError> {
        let (Some(folder_name), Some(message)) = (&self.folder_name, &self.message) else {
            return Err(EncodeError::Cleared);
        };

        let mut ctx = EncodeContext::new();
        ctx.write_all(b"APPEND ");
        encode::mailbox(&mut ctx, folder_name);

        if !self.flags.is_empty() {
            for flag in self.flags.iter() {
                verify_flag(flag)?;
            }

            ctx.write_all(format!(" ({})", self.flags.join(" ")).as_bytes());
        }

        if let Some(date) = self.date {
            ctx.write_all(format!(" \"{}\"", date.format("%d-%b-%Y %H:%M:%S %z")).as_bytes());
        }

        ctx.write_all(b" ");
        encode::literal(&mut ctx, message.declassify(), self.literal_mode)?;
        ctx.write_all(b"\r\n");

        Ok(self.pending.split_off_first(ctx.into_encoded()))
    }

    fn has_next_continuation(&self) -> bool {
        self.pending.has_next()
    }

    fn next_continuation_line(&mut self, _: &ContinuationRequest) -> Option<Vec<u8>> {
        self.pending.next()
    }

    fn is_sensitive(&self) -> bool {
        true
    }

    fn debug_data(&self) -> Option<String> {
        let folder_name = self.folder_name.as_ref()?;
        let size = self.message.as_ref().map(|message| message.declassify().len())?;

        Some(format!("APPEND {size} bytes TO {folder_name}"))
    }

    fn cleanup(&mut self) {
        self.folder_name = None;
        self.flags.clear();
        self.date = None;
        self.message = None;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_append() {
        let mut command = Append::new("Drafts", "Hello").with_flags(["\\Seen", "$Forwarded"]);

        assert_eq!(
            b"APPEND Drafts (\\Seen $Forwarded) {5}\r\n".to_vec(),
            command.command_line().unwrap()
        );
        assert!(command.has_next_continuation());
        assert_eq!(
            Some(b"Hello\r\n".to_vec()),
            command.next_continuation_line(&ContinuationRequest::new("Ready for literal data"))
        );
        assert!(!command.has_next_continuation());
    }

    #[test]
    fn test_append_with_date() {
        let date = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2023, 7, 5, 9, 3, 7)
            .unwrap();
        let mut command = Append::new("测试", "Hi")
            .with_date(date)
            .with_literal_mode(LiteralMode::NonSync);

        assert_eq!(
            b"APPEND &bUuL1Q- \"05-Jul-2023 09:03:07 +0200\" {2+}\r\nHi\r\n".to_vec(),
            command.command_line().unwrap()
        );
        assert!(!command.has_next_continuation());
    }

    #[test]
    fn test_append_invalid() {
        let tests = [
            (Append::new("INBOX", "x").with_flags(["\\"]), EncodeError::Empty),
            (
                Append::new("INBOX", "x").with_flags(["\\See n"]),
                EncodeError::ByteNotAllowed {
                    found: b' ',
                    position: 4,
                },
            ),
            (
                Append::new("INBOX", "a\0b"),
                EncodeError::ByteNotAllowed {
                    found: 0,
                    position: 1,
                },
            ),
        ];

        for (mut command, expected) in tests {
            assert_eq!(Err(expected), command.command_line());
        }
    }

    #[test]
    fn test_append_cleanup() {
        let mut command = Append::new("Drafts", "Hello");
        command.command_line().unwrap();

        assert_eq!(
            Some(String::from("APPEND 5 bytes TO Drafts")),
            command.debug_data()
        );

        command.cleanup();
        assert!(!command.has_next_continuation());
        assert_eq!(None, command.debug_data());
        assert_eq!(Err(EncodeError::Cleared), command.command_line());
    }
}
