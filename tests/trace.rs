use futures::{
    channel::mpsc::{self, UnboundedReceiver},
    executor::block_on,
};
use imap_pipeline::{
    codec::LiteralMode,
    command::{
        Append, AuthenticatePlain, Command, ListFolders, Login, SelectFolder, SimpleCommand,
        Status, StatusItem, SubscribeFolder,
    },
    error::CommandError,
    response::{Data, Response, StatusKind},
    session::{CommandHandle, Session, SessionConfig, SessionState},
};

enum Who {
    Client,
    Server,
}

struct TraceLines<'a> {
    trace: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for TraceLines<'a> {
    type Item = (Who, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let input = &self.trace[self.offset..];

        if let Some(pos) = input.iter().position(|b| *b == b'\n') {
            let who = match &input[..3] {
                b"C: " => Who::Client,
                b"S: " => Who::Server,
                _ => panic!("Line must begin with \"C: \" or \"S: \"."),
            };

            self.offset += pos + 1;

            Some((who, &input[3..pos + 1]))
        } else {
            None
        }
    }
}

fn split_trace(trace: &[u8]) -> impl Iterator<Item = (Who, &[u8])> {
    TraceLines { trace, offset: 0 }
}

/// Just enough of a response parser to drive the session.
fn parse_response(line: &str) -> Response {
    if let Some(text) = line.strip_prefix('+') {
        return Response::continuation(text.trim_start());
    }

    if line.starts_with("* ") {
        return Response::data(line);
    }

    let (tag, rest) = line.split_once(' ').unwrap();
    let (status, text) = rest.split_once(' ').unwrap_or((rest, ""));
    let kind = match status {
        "OK" => StatusKind::Ok,
        "NO" => StatusKind::No,
        "BAD" => StatusKind::Bad,
        _ => panic!("Unexpected status {status:?}"),
    };

    Response::tagged(tag, kind, text).unwrap()
}

fn compare_written(wire: &mut UnboundedReceiver<Vec<u8>>, expected: &mut Vec<u8>) {
    let mut written = Vec::new();
    while let Ok(Some(data)) = wire.try_next() {
        written.extend_from_slice(&data);
    }

    assert_eq!(
        String::from_utf8_lossy(expected),
        String::from_utf8_lossy(&written)
    );
    expected.clear();
}

/// Replay `trace` against `session`.
///
/// Client lines must be exactly what the session wrote before the next server line.
fn test_lines_of_trace(session: &Session, wire: &mut UnboundedReceiver<Vec<u8>>, trace: &str) {
    let mut expected = Vec::new();

    for (who, line) in split_trace(trace.as_bytes()) {
        // Replace last "\n" with "\r\n".
        let line = {
            let mut line = line[..line.len().saturating_sub(1)].to_vec();
            line.extend_from_slice(b"\r\n");
            line
        };

        match who {
            Who::Client => {
                println!("C: {}", String::from_utf8_lossy(&line).trim());
                expected.extend_from_slice(&line);
            }
            Who::Server => {
                compare_written(wire, &mut expected);

                let line = String::from_utf8(line).unwrap();
                println!("S: {}", line.trim());
                session
                    .on_response(parse_response(line.trim_end_matches("\r\n")))
                    .unwrap();
            }
        }
    }

    compare_written(wire, &mut expected);
}

fn setup(config: SessionConfig) -> (Session, UnboundedReceiver<Vec<u8>>, UnboundedReceiver<Data>) {
    let (transport, wire) = mpsc::unbounded();
    let (session, unsolicited) = Session::new(transport, config).unwrap();

    (session, wire, unsolicited)
}

fn submit_all(session: &Session, commands: Vec<Box<dyn Command>>) -> Vec<CommandHandle> {
    commands
        .into_iter()
        .map(|command| session.submit_boxed(command).unwrap())
        .collect()
}

#[test]
fn test_trace_pipelined_with_literal() {
    let (session, mut wire, mut unsolicited) = setup(SessionConfig::default());

    let handles = submit_all(
        &session,
        vec![
            Box::new(Login::new("alice", "Pa²²W0rD")),
            Box::new(SubscribeFolder::new("测试")),
            Box::new(SelectFolder::new("INBOX")),
        ],
    );

    let trace = r#"C: A1 LOGIN alice {10}
S: + Ready for additional command text
C: Pa²²W0rD
C: A2 SUBSCRIBE &bUuL1Q-
C: A3 SELECT INBOX
S: * 3 EXISTS
S: A3 OK [READ-WRITE] SELECT completed
S: A2 OK SUBSCRIBE completed
S: A1 OK LOGIN completed
"#;

    test_lines_of_trace(&session, &mut wire, trace);

    let texts: Vec<String> = handles
        .into_iter()
        .map(|handle| block_on(handle).unwrap().text)
        .collect();
    assert_eq!(
        vec![
            "LOGIN completed",
            "SUBSCRIBE completed",
            "[READ-WRITE] SELECT completed"
        ],
        texts
    );

    assert_eq!(
        Data::new("* 3 EXISTS"),
        unsolicited.try_next().unwrap().unwrap()
    );
    assert_eq!(SessionState::Idle, session.state());
}

#[test]
fn test_trace_authenticate_and_append() {
    let (session, mut wire, _unsolicited) = setup(SessionConfig::default());

    let handles = submit_all(
        &session,
        vec![
            Box::new(AuthenticatePlain::new("alice", "password")),
            Box::new(
                Append::new("Drafts", "Hello")
                    .with_flags(["\\Draft"])
                    .with_literal_mode(LiteralMode::NonSync),
            ),
            Box::new(ListFolders::list("", "*")),
            Box::new(Status::new(
                "Drafts",
                [StatusItem::Messages, StatusItem::UidNext],
            )),
        ],
    );

    let trace = r#"C: A1 AUTHENTICATE PLAIN
S: +
C: AGFsaWNlAHBhc3N3b3Jk
C: A2 APPEND Drafts (\Draft) {5+}
C: Hello
C: A3 LIST "" *
C: A4 STATUS Drafts (MESSAGES UIDNEXT)
S: A1 OK Success
S: A2 OK [APPENDUID 38505 3955] APPEND completed
S: * LIST (\HasNoChildren) "/" Drafts
S: A3 OK LIST completed
S: * STATUS Drafts (MESSAGES 1 UIDNEXT 3956)
S: A4 OK STATUS completed
"#;

    test_lines_of_trace(&session, &mut wire, trace);

    for handle in handles {
        assert!(block_on(handle).is_ok());
    }
}

#[test]
fn test_trace_failures() {
    let (session, mut wire, _unsolicited) = setup(SessionConfig::default());

    let handles = submit_all(
        &session,
        vec![
            Box::new(SelectFolder::new("Does Not Exist")),
            Box::new(SimpleCommand::expunge()),
            Box::new(SimpleCommand::logout()),
        ],
    );

    let trace = r#"C: A1 SELECT "Does Not Exist"
C: A2 EXPUNGE
C: A3 LOGOUT
S: A1 NO [NONEXISTENT] Unknown Mailbox
S: A2 BAD No mailbox selected
S: * BYE IMAP4rev1 Server logging out
S: A3 OK LOGOUT completed
"#;

    test_lines_of_trace(&session, &mut wire, trace);
    session.on_connection_closed();

    let outcomes: Vec<_> = handles.into_iter().map(block_on).collect();
    assert_eq!(
        Err(CommandError::No(String::from(
            "[NONEXISTENT] Unknown Mailbox"
        ))),
        outcomes[0]
    );
    assert_eq!(
        Err(CommandError::Bad(String::from("No mailbox selected"))),
        outcomes[1]
    );
    assert_eq!("LOGOUT completed", outcomes[2].as_ref().unwrap().text);
    assert_eq!(SessionState::Closed, session.state());
}
