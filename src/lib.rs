//! # Pipelining IMAP client core
//!
//! imap-pipeline encodes IMAP commands and runs many of them concurrently over a single
//! connection. Every command is identified by a unique tag, and its completion is matched back to
//! the caller by tag, in whatever order the server answers.
//!
//! The crate consists of two layers:
//!
//! * the command layer ([`command`], [`mailbox`], [`utf7`]) turns typed commands into wire lines,
//!   quoting, escaping and transcoding mailbox names, and splitting commands at synchronizing
//!   literals, and
//! * the [`session`] engine assigns tags, keeps track of outstanding commands, answers
//!   continuation requests, and resolves [`CommandHandle`](session::CommandHandle)s on completion,
//!   timeout, cancellation, or connection loss.
//!
//! Socket I/O, TLS, and response parsing are left to the caller: bytes leave through a
//! [`Transport`](session::Transport) and parsed [`Response`](response::Response)s come back in.
//!
//! ## Example
//!
//! ```rust
//! use futures::{channel::mpsc, executor::block_on};
//! use imap_pipeline::{
//!     command::{Login, SubscribeFolder},
//!     response::Response,
//!     session::{Session, SessionConfig},
//! };
//!
//! let (transport, mut wire) = mpsc::unbounded::<Vec<u8>>();
//! let (session, _unsolicited) = Session::new(transport, SessionConfig::default()).unwrap();
//!
//! let login = session.submit(Login::new("alice", "Pa²²W0rD")).unwrap();
//! let subscribe = session.submit(SubscribeFolder::new("测试")).unwrap();
//!
//! // C: A1 LOGIN alice {10}
//! // S: + Ready for additional command text
//! // C: Pa²²W0rD
//! // C: A2 SUBSCRIBE &bUuL1Q-
//! // S: A2 OK SUBSCRIBE completed
//! // S: A1 OK LOGIN completed
//! session.on_response(Response::continuation("Ready for additional command text")).unwrap();
//! session.on_response(Response::ok("A2", "SUBSCRIBE completed").unwrap()).unwrap();
//! session.on_response(Response::ok("A1", "LOGIN completed").unwrap()).unwrap();
//!
//! assert!(block_on(subscribe).is_ok());
//! assert!(block_on(login).is_ok());
//!
//! let mut written = Vec::new();
//! while let Ok(Some(data)) = wire.try_next() {
//!     written.extend_from_slice(&data);
//! }
//! assert_eq!(
//!     written,
//!     "A1 LOGIN alice {10}\r\nPa²²W0rD\r\nA2 SUBSCRIBE &bUuL1Q-\r\n".as_bytes()
//! );
//! ```
//!
//! # Features
//!
//! | Feature | Description                                                    | Enabled by default |
//! |---------|----------------------------------------------------------------|--------------------|
//! | serde   | Derive `serdes` `Serialize` and `Deserialize` implementations. | No                 |
//! | tokio   | Provide `tokio` support (channel transport, driver, sweeper).  | No                 |

#![forbid(unsafe_code)]
#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod codec;
pub mod command;
pub mod core;
pub mod error;
pub mod mailbox;
pub mod response;
pub mod secret;
pub mod session;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod tokio;
pub mod utf7;
pub mod utils;
