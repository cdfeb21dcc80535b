//! In-memory frame channel for testing
//!
//! A pair of endpoints connected by unbounded queues. What one endpoint
//! sends, the other receives; dropping an endpoint closes the channel
//! for its peer, the same way a TCP disconnect would.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::channel::{ChannelError, FrameChannel};
use crate::frame::Frame;

const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(250);

/// One endpoint of an in-memory frame channel pair.
pub struct MockFrameChannel {
    tx: mpsc::UnboundedSender<Frame>,
    rx: mpsc::UnboundedReceiver<Frame>,
    recv_timeout: Duration,
}

impl MockFrameChannel {
    /// Create two connected endpoints.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: a_tx,
                rx: a_rx,
                recv_timeout: DEFAULT_RECV_TIMEOUT,
            },
            Self {
                tx: b_tx,
                rx: b_rx,
                recv_timeout: DEFAULT_RECV_TIMEOUT,
            },
        )
    }

    /// Override the per-attempt receive timeout. Tests exercising
    /// absent-frame faults use a short timeout to stay fast.
    pub fn with_recv_timeout(mut self, recv_timeout: Duration) -> Self {
        self.recv_timeout = recv_timeout;
        self
    }
}

#[async_trait]
impl FrameChannel for MockFrameChannel {
    async fn send(&mut self, frame: &Frame) -> Result<(), ChannelError> {
        self.tx.send(*frame).map_err(|_| ChannelError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<Frame>, ChannelError> {
        match timeout(self.recv_timeout, self.rx.recv()).await {
            Err(_elapsed) => Ok(None),
            Ok(None) => Err(ChannelError::Closed),
            Ok(Some(frame)) => Ok(Some(frame)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_cross_between_endpoints() {
        let (mut a, mut b) = MockFrameChannel::pair();
        let frame = Frame::from_bytes([1, 2, 3, 4, 5, 6, 7, 8]);

        a.send(&frame).await.unwrap();
        assert_eq!(b.recv().await.unwrap(), Some(frame));
    }

    #[tokio::test]
    async fn recv_attempt_times_out_without_traffic() {
        let (a, _b) = MockFrameChannel::pair();
        let mut a = a.with_recv_timeout(Duration::from_millis(10));
        assert!(a.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropped_peer_closes_the_channel() {
        let (mut a, b) = MockFrameChannel::pair();
        drop(b);

        let frame = Frame::from_bytes([0; 8]);
        assert!(matches!(a.send(&frame).await, Err(ChannelError::Closed)));
        assert!(matches!(a.recv().await, Err(ChannelError::Closed)));
    }
}
