//! Running a [`Session`] on tokio.
//!
//! ```rust,no_run
//! # use futures::stream;
//! # use imap_pipeline::{response::Response, session::{Session, SessionConfig}};
//! # use std::time::Duration;
//! # #[tokio::main]
//! # async fn main() {
//! # let stream = tokio::io::sink();
//! # let responses = stream::empty::<Result<Response, std::io::Error>>();
//! use imap_pipeline::tokio::{channel, drive, sweep_task, write_task};
//!
//! let (transport, outgoing) = channel();
//! let (session, _unsolicited) = Session::new(transport, SessionConfig::default()).unwrap();
//!
//! tokio::spawn(write_task(outgoing, stream));
//! tokio::spawn(sweep_task(session.clone(), Duration::from_secs(1)));
//! tokio::spawn(drive(session.clone(), responses));
//! # }
//! ```

use std::{fmt::Display, io, time::Duration};

use bytes::Bytes;
use futures::{SinkExt, Stream, StreamExt};
use log::{debug, warn};
use ::tokio::{io::AsyncWrite, sync::mpsc, time};
use tokio_util::codec::{BytesCodec, FramedWrite};

use crate::{
    error::SessionError,
    response::Response,
    session::{Session, Transport},
};

/// A [`Transport`] that hands bytes to a [`write_task`].
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<Bytes>,
}

impl Transport for ChannelTransport {
    fn write(&self, data: Vec<u8>) -> io::Result<()> {
        self.sender
            .send(Bytes::from(data))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "write task is gone"))
    }
}

/// Create a [`ChannelTransport`] and the receiver to pass to [`write_task`].
pub fn channel() -> (ChannelTransport, mpsc::UnboundedReceiver<Bytes>) {
    let (sender, receiver) = mpsc::unbounded_channel();

    (ChannelTransport { sender }, receiver)
}

/// Write everything from `receiver` to `writer` until all transports are dropped.
pub async fn write_task<W>(
    mut receiver: mpsc::UnboundedReceiver<Bytes>,
    writer: W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut framed = FramedWrite::new(writer, BytesCodec::new());

    while let Some(data) = receiver.recv().await {
        framed.send(data).await?;
    }

    SinkExt::<Bytes>::close(&mut framed).await
}

/// Feed `responses` into `session` until the stream ends.
///
/// A protocol violation or a stream error fails the session, the end of the stream closes it.
pub async fn drive<S, E>(session: Session, mut responses: S) -> Result<(), SessionError>
where
    S: Stream<Item = Result<Response, E>> + Unpin,
    E: Display,
{
    while let Some(item) = responses.next().await {
        match item {
            Ok(response) => match session.on_response(response) {
                Ok(()) => {}
                Err(error) if error.is_protocol_violation() => {
                    warn!("Giving up on connection: {error}");
                    session.fail(error.to_string());
                    return Err(error);
                }
                Err(SessionError::Closed) => return Err(SessionError::Closed),
                Err(error) => warn!("Response not processed: {error}"),
            },
            Err(error) => {
                warn!("Reading responses failed: {error}");
                session.fail(error.to_string());
                return Err(SessionError::Transport(error.to_string()));
            }
        }
    }

    debug!("Response stream ended");
    session.on_connection_closed();

    Ok(())
}

/// Sweep `session` for expired commands every `period` until it is closed.
pub async fn sweep_task(session: Session, period: Duration) {
    let mut interval = time::interval(period);

    loop {
        interval.tick().await;

        if session.is_closed() {
            break;
        }

        session.sweep_expired(std::time::Instant::now());
    }
}
