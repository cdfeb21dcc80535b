//! ISO-TP style transport layer for the diagnostic endpoint
//!
//! This crate turns a stream of fixed-size 8-byte frames into logical
//! messages of up to 4095 bytes and back, following the ISO 15765-2
//! segmentation scheme:
//! - Single Frame for payloads of up to 7 bytes
//! - First Frame / Flow Control / Consecutive Frame for longer payloads
//!
//! The frame channel itself is abstract (see [`FrameChannel`]); concrete
//! implementations are provided for TCP ([`TcpFrameChannel`]) and for
//! in-process testing ([`mock::MockFrameChannel`]).

mod channel;
mod frame;
mod framer;
pub mod mock;
mod tcp;

pub use channel::{ChannelError, FrameChannel};
pub use frame::{Frame, Pci, FRAME_LEN};
pub use framer::{FramerError, IsoTp, MAX_MESSAGE_LEN};
pub use tcp::TcpFrameChannel;
