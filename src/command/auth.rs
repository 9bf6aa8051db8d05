//! Commands carrying credentials.
//!
//! Both commands report [`Command::is_sensitive`], so their wire bytes never reach the logs, and
//! wipe their credentials on cleanup.

use base64::{engine::general_purpose::STANDARD as _base64, Engine};

use crate::{
    codec::{
        encode::{self, EncodeContext},
        LiteralMode,
    },
    command::{Command, CommandType, Continuations},
    error::EncodeError,
    response::ContinuationRequest,
    secret::Secret,
};

/// `login = "LOGIN" SP userid SP password`
///
/// Username and password are sent as atom, quoted string, or literal, whatever fits. Literals
/// are synchronizing by default, i.e., each one waits for a continuation request.
///
/// ```imap
/// C: A1 LOGIN alice {10}
/// S: + Ready for additional command text
/// C: Pa²²W0rD
/// S: A1 OK LOGIN completed
/// ```
#[derive(Debug)]
pub struct Login {
    username: Option<Secret<String>>,
    password: Option<Secret<String>>,
    literal_mode: LiteralMode,
    pending: Continuations,
}

impl Login {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(Secret::new(username.into())),
            password: Some(Secret::new(password.into())),
            literal_mode: LiteralMode::Sync,
            pending: Continuations::default(),
        }
    }

    /// Use non-synchronizing literals (requires `LITERAL+`).
    pub fn with_literal_mode(mut self, literal_mode: LiteralMode) -> Self {
        self.literal_mode = literal_mode;
        self
    }
}

impl Command for Login {
    fn command_type(&self) -> CommandType {
        CommandType::Login
    }

    fn command_line(&mut self) -> Result<Vec<u8>, EncodeError> {
        let (Some(username), Some(password)) = (&self.username, &self.password) else {
            return Err(EncodeError::Cleared);
        };

        let mut ctx = EncodeContext::new();
        ctx.write_all(b"LOGIN ");
        encode::astring(&mut ctx, username.declassify().as_bytes(), self.literal_mode)?;
        ctx.write_all(b" ");
        encode::astring(&mut ctx, password.declassify().as_bytes(), self.literal_mode)?;
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
        self.username
            .as_ref()
            .map(|username| format!("LOGIN FOR USER: {}", username.declassify()))
    }

    fn cleanup(&mut self) {
        self.username = None;
        self.password = None;
        self.pending.clear();
    }
}

/// `authenticate = "AUTHENTICATE" SP auth-type [SP initial-response]` with the `PLAIN` mechanism
/// ([RFC 4616]).
///
/// Without SASL-IR ([RFC 4959]) the credentials are sent after the server's (empty)
/// continuation request:
///
/// ```imap
/// C: A1 AUTHENTICATE PLAIN
/// S: +
/// C: AGFsaWNlAHBhc3N3b3Jk
/// S: A1 OK Success
/// ```
///
/// [RFC 4616]: https://www.rfc-editor.org/rfc/rfc4616
/// [RFC 4959]: https://www.rfc-editor.org/rfc/rfc4959
#[derive(Debug)]
pub struct AuthenticatePlain {
    authorization_id: Option<Secret<String>>,
    username: Option<Secret<String>>,
    password: Option<Secret<String>>,
    initial_response: bool,
    cleared: bool,
    pending: Continuations,
}

impl AuthenticatePlain {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            authorization_id: None,
            username: Some(Secret::new(username.into())),
            password: Some(Secret::new(password.into())),
            initial_response: false,
            cleared: false,
            pending: Continuations::default(),
        }
    }

    /// Act on behalf of `authorization_id`.
    pub fn with_authorization_id(mut self, authorization_id: impl Into<String>) -> Self {
        self.authorization_id = Some(Secret::new(authorization_id.into()));
        self
    }

    /// Send the credentials with the command itself (requires `SASL-IR`).
    pub fn with_initial_response(mut self, initial_response: bool) -> Self {
        self.initial_response = initial_response;
        self
    }

    fn encoded_credentials(&self) -> Result<Secret<Vec<u8>>, EncodeError> {
        let (Some(username), Some(password)) = (&self.username, &self.password) else {
            return Err(EncodeError::Cleared);
        };

        let authorization_id = self
            .authorization_id
            .as_ref()
            .map(|id| id.declassify().as_str())
            .unwrap_or_default();
        let parts = [
            authorization_id,
            username.declassify().as_str(),
            password.declassify().as_str(),
        ];

        for part in parts {
            if let Some(position) = part.bytes().position(|b| b == 0) {
                return Err(EncodeError::ByteNotAllowed { found: 0, position });
            }
        }

        let message = Secret::new(parts.join("\0").into_bytes());

        let mut encoded = _base64.encode(message.declassify()).into_bytes();
        encoded.extend_from_slice(b"\r\n");

        Ok(Secret::new(encoded))
    }
}

impl Command for AuthenticatePlain {
    fn command_type(&self) -> CommandType {
        CommandType::Authenticate
    }

    fn command_line(&mut self) -> Result<Vec<u8>, EncodeError> {
        if self.cleared {
            return Err(EncodeError::Cleared);
        }

        let credentials = self.encoded_credentials()?;
        self.pending.clear();

        if self.initial_response {
            let mut line = b"AUTHENTICATE PLAIN ".to_vec();
            line.extend_from_slice(credentials.declassify());

            Ok(line)
        } else {
            self.pending.push(credentials.declassify().clone());

            Ok(b"AUTHENTICATE PLAIN\r\n".to_vec())
        }
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
        self.username
            .as_ref()
            .map(|username| format!("AUTHENTICATE PLAIN FOR USER: {}", username.declassify()))
    }

    fn cleanup(&mut self) {
        self.authorization_id = None;
        self.username = None;
        self.password = None;
        self.cleared = true;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login() {
        let tests = [
            ("alice", "password", "LOGIN alice password\r\n"),
            ("alice", "pass word", "LOGIN alice \"pass word\"\r\n"),
            ("al\"ice", "", "LOGIN \"al\\\"ice\" \"\"\r\n"),
        ];

        for (username, password, expected) in tests {
            let mut command = Login::new(username, password);

            assert_eq!(expected.as_bytes(), command.command_line().unwrap());
            assert!(!command.has_next_continuation());
            assert!(command.is_sensitive());
        }
    }

    #[test]
    fn test_login_with_literal() {
        let mut command = Login::new("alice", "Pa²²W0rD");

        assert_eq!(
            b"LOGIN alice {10}\r\n".to_vec(),
            command.command_line().unwrap()
        );
        assert!(command.has_next_continuation());
        assert_eq!(
            Some("Pa²²W0rD\r\n".as_bytes().to_vec()),
            command.next_continuation_line(&ContinuationRequest::new("Ready"))
        );
        assert!(!command.has_next_continuation());

        // Re-encoding restores the pending chunk.
        command.command_line().unwrap();
        assert!(command.has_next_continuation());
    }

    #[test]
    fn test_login_with_two_literals() {
        let mut command = Login::new("ä", "ö");
        let request = ContinuationRequest::default();

        assert_eq!(b"LOGIN {2}\r\n".to_vec(), command.command_line().unwrap());
        assert_eq!(
            Some("ä {2}\r\n".as_bytes().to_vec()),
            command.next_continuation_line(&request)
        );
        assert_eq!(
            Some("ö\r\n".as_bytes().to_vec()),
            command.next_continuation_line(&request)
        );
        assert_eq!(None, command.next_continuation_line(&request));
    }

    #[test]
    fn test_login_with_non_sync_literal() {
        let mut command = Login::new("alice", "Pa²²W0rD").with_literal_mode(LiteralMode::NonSync);

        assert_eq!(
            "LOGIN alice {10+}\r\nPa²²W0rD\r\n".as_bytes().to_vec(),
            command.command_line().unwrap()
        );
        assert!(!command.has_next_continuation());
    }

    #[test]
    fn test_login_cleanup() {
        let mut command = Login::new("alice", "Pa²²W0rD");
        command.command_line().unwrap();

        assert_eq!(
            Some(String::from("LOGIN FOR USER: alice")),
            command.debug_data()
        );

        command.cleanup();
        assert!(!command.has_next_continuation());
        assert_eq!(None, command.debug_data());
        assert_eq!(CommandType::Login, command.command_type());
        assert_eq!(Err(EncodeError::Cleared), command.command_line());
    }

    #[test]
    fn test_login_rejects_nul() {
        let mut command = Login::new("alice", "pass\0word");

        assert_eq!(
            Err(EncodeError::ByteNotAllowed {
                found: 0,
                position: 4
            }),
            command.command_line()
        );
    }

    #[test]
    fn test_authenticate_plain() {
        let mut command = AuthenticatePlain::new("alice", "password");

        assert_eq!(
            b"AUTHENTICATE PLAIN\r\n".to_vec(),
            command.command_line().unwrap()
        );
        assert!(command.has_next_continuation());
        assert_eq!(
            Some(b"AGFsaWNlAHBhc3N3b3Jk\r\n".to_vec()),
            command.next_continuation_line(&ContinuationRequest::default())
        );
        assert!(!command.has_next_continuation());
    }

    #[test]
    fn test_authenticate_plain_initial_response() {
        let mut command = AuthenticatePlain::new("alice", "password")
            .with_authorization_id("admin")
            .with_initial_response(true);

        assert_eq!(
            b"AUTHENTICATE PLAIN YWRtaW4AYWxpY2UAcGFzc3dvcmQ=\r\n".to_vec(),
            command.command_line().unwrap()
        );
        assert!(!command.has_next_continuation());
    }

    #[test]
    fn test_authenticate_plain_cleanup() {
        let mut command = AuthenticatePlain::new("alice", "password");
        command.command_line().unwrap();

        command.cleanup();
        command.cleanup();

        assert!(!command.has_next_continuation());
        assert_eq!(CommandType::Authenticate, command.command_type());
        assert_eq!(Err(EncodeError::Cleared), command.command_line());
    }
}
