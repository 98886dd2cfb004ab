use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tokio_util::codec::{BytesCodec, FramedWrite};
use tracing::{error, info, trace, warn};

use crate::connection::{Channel, WriteToken};
use crate::protocol::ChannelError;

#[derive(Debug)]
enum Command {
    Write(Bytes, WriteToken),
    Close,
}

/// A [`Channel`] backed by a tokio writer.
///
/// Frames are queued to a [`ChannelWriter`] that owns the underlying IO and writes them
/// one after another, so completion order always matches issue order. Once a write
/// fails or the channel is closed, every later write resolves with [`ChannelError::Closed`].
#[derive(Debug, Clone)]
pub struct FramedChannel {
    commands: mpsc::UnboundedSender<Command>,
}

impl FramedChannel {
    /// Creates the channel and the writer that must be driven for frames to reach `writer`.
    pub fn new<W>(writer: W) -> (Self, ChannelWriter<W>)
    where
        W: AsyncWrite + Unpin,
    {
        let (tx, rx) = mpsc::unbounded();
        let framed = FramedWrite::new(writer, BytesCodec::new());
        (Self { commands: tx }, ChannelWriter { framed, commands: rx, closed: false })
    }

    /// Creates the channel and drives its writer on the current tokio runtime.
    pub fn spawn<W>(writer: W) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (channel, channel_writer) = Self::new(writer);
        (channel, tokio::spawn(channel_writer.run()))
    }
}

impl Channel for FramedChannel {
    fn write(&self, frame: Bytes) -> WriteToken {
        let token = WriteToken::new();
        if self.commands.unbounded_send(Command::Write(frame, token.clone())).is_err() {
            trace!("channel writer is gone, fail the write");
            token.fail(ChannelError::Closed);
        }
        token
    }

    fn close(&self) {
        if self.commands.unbounded_send(Command::Close).is_err() {
            trace!("channel writer already stopped");
        }
    }
}

/// Owns the write half of a connection on behalf of a [`FramedChannel`].
#[derive(Debug)]
pub struct ChannelWriter<W> {
    framed: FramedWrite<W, BytesCodec>,
    commands: mpsc::UnboundedReceiver<Command>,
    closed: bool,
}

impl<W> ChannelWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Writes queued frames until every [`FramedChannel`] handle has been dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.commands.next().await {
            match command {
                Command::Write(frame, token) => {
                    if self.closed {
                        token.fail(ChannelError::Closed);
                        continue;
                    }

                    match self.framed.send(frame).await {
                        Ok(()) => {
                            token.succeed(());
                        }
                        Err(e) => {
                            error!(cause = %e, "failed to write frame, channel is closed from now on");
                            self.closed = true;
                            token.fail(ChannelError::from(e));
                        }
                    }
                }

                Command::Close => {
                    if self.closed {
                        continue;
                    }
                    self.closed = true;
                    match SinkExt::<Bytes>::close(&mut self.framed).await {
                        Ok(()) => info!("channel closed"),
                        Err(e) => warn!(cause = %e, "failed to shutdown channel"),
                    }
                }
            }
        }
    }
}
