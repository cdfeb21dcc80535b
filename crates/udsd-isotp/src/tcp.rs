//! Frame channel over a TCP stream

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::channel::{ChannelError, FrameChannel};
use crate::frame::{Frame, FRAME_LEN};

/// Per-attempt socket timeout.
const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Exchanges 8-byte frames over a connected TCP stream.
pub struct TcpFrameChannel {
    stream: TcpStream,
    recv_timeout: Duration,
}

impl TcpFrameChannel {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        }
    }

    /// Override the per-attempt receive timeout.
    pub fn with_recv_timeout(mut self, recv_timeout: Duration) -> Self {
        self.recv_timeout = recv_timeout;
        self
    }
}

fn map_io_error(err: std::io::Error) -> ChannelError {
    match err.kind() {
        ErrorKind::UnexpectedEof
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe => ChannelError::Closed,
        _ => ChannelError::Io(err.to_string()),
    }
}

#[async_trait]
impl FrameChannel for TcpFrameChannel {
    async fn send(&mut self, frame: &Frame) -> Result<(), ChannelError> {
        self.stream
            .write_all(frame.as_bytes())
            .await
            .map_err(map_io_error)
    }

    async fn recv(&mut self) -> Result<Option<Frame>, ChannelError> {
        let mut buf = [0u8; FRAME_LEN];
        match timeout(self.recv_timeout, self.stream.read_exact(&mut buf)).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok(_)) => Ok(Some(Frame::from_bytes(buf))),
            Ok(Err(err)) => Err(map_io_error(err)),
        }
    }
}
