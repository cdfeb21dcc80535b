//! Frame channel abstraction

use async_trait::async_trait;
use thiserror::Error;

use crate::frame::Frame;

/// Channel-level faults. These are fatal to the connection, unlike
/// transport faults which are handled by the framer's caller.
#[derive(Debug, Error, Clone)]
pub enum ChannelError {
    #[error("channel closed by peer")]
    Closed,

    #[error("channel I/O error: {0}")]
    Io(String),
}

/// A duplex channel exchanging atomic 8-byte frames.
///
/// This abstracts the underlying medium (TCP, in-memory test pair) and
/// provides the only two primitives the framer needs: send one frame,
/// and make one bounded receive attempt.
#[async_trait]
pub trait FrameChannel: Send {
    /// Send one frame.
    async fn send(&mut self, frame: &Frame) -> Result<(), ChannelError>;

    /// Make one receive attempt, bounded by the channel's per-attempt
    /// timeout. `Ok(None)` means the attempt timed out without a frame;
    /// it carries no protocol meaning on its own.
    async fn recv(&mut self) -> Result<Option<Frame>, ChannelError>;
}
