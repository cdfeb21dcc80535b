//! Atomic 8-byte frame and its protocol control information

use std::fmt;

/// Every frame on the wire is exactly this long.
pub const FRAME_LEN: usize = 8;

/// Frame type, encoded in the high nibble of byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Pci {
    /// Single Frame: low nibble of byte 0 is the payload length (0-7)
    Single = 0x0,
    /// First Frame: 12-bit message length in the low nibble and byte 1
    First = 0x1,
    /// Consecutive Frame: low nibble of byte 0 is the sequence number
    Consecutive = 0x2,
    /// Flow Control: continue-to-send indication
    FlowControl = 0x3,
}

impl Pci {
    /// Decode the type nibble of a PCI byte. Nibbles above 3 are not
    /// valid frame types.
    pub fn from_pci_byte(byte: u8) -> Option<Self> {
        match byte >> 4 {
            0x0 => Some(Pci::Single),
            0x1 => Some(Pci::First),
            0x2 => Some(Pci::Consecutive),
            0x3 => Some(Pci::FlowControl),
            _ => None,
        }
    }
}

/// One atomic frame as exchanged over the channel.
///
/// Frames are stateless on the wire; all sequencing state lives in the
/// [`IsoTp`](crate::IsoTp) framer for the duration of one transfer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame(pub(crate) [u8; FRAME_LEN]);

impl Frame {
    pub fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Frame(bytes)
    }

    /// Build a Single Frame carrying `payload` (at most 7 bytes),
    /// zero-padded to the full frame length.
    pub(crate) fn single(payload: &[u8]) -> Self {
        debug_assert!(payload.len() <= FRAME_LEN - 1);
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = payload.len() as u8;
        bytes[1..1 + payload.len()].copy_from_slice(payload);
        Frame(bytes)
    }

    /// Build a First Frame announcing a message of `len` bytes and
    /// carrying its first 6 bytes.
    pub(crate) fn first(len: u16, head: &[u8]) -> Self {
        debug_assert!(head.len() == FRAME_LEN - 2);
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = 0x10 | ((len >> 8) as u8 & 0x0F);
        bytes[1] = (len & 0xFF) as u8;
        bytes[2..].copy_from_slice(head);
        Frame(bytes)
    }

    /// Build a Consecutive Frame with sequence number `seq` (0-15) and
    /// up to 7 payload bytes, zero-padded.
    pub(crate) fn consecutive(seq: u8, chunk: &[u8]) -> Self {
        debug_assert!(seq < 0x10);
        debug_assert!(chunk.len() <= FRAME_LEN - 1);
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = 0x20 | seq;
        bytes[1..1 + chunk.len()].copy_from_slice(chunk);
        Frame(bytes)
    }

    /// Build a continue-to-send Flow Control frame.
    pub(crate) fn flow_control() -> Self {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = 0x30;
        Frame(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Byte 0: frame type nibble plus type-specific low nibble.
    pub fn pci_byte(&self) -> u8 {
        self.0[0]
    }

    pub fn pci(&self) -> Option<Pci> {
        Pci::from_pci_byte(self.0[0])
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(")?;
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        write!(f, ")")
    }
}
