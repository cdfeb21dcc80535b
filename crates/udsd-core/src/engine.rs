//! Per-connection engine: receive, validate, dispatch, respond

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use udsd_isotp::{ChannelError, FrameChannel, FramerError, IsoTp};

use crate::firmware::FirmwareImage;
use crate::nrc::Nrc;
use crate::service::{negative_response, positive_response, ServiceId};
use crate::state::{DiagState, Security, Session};

/// Sent once per connection, before the request loop starts.
pub const CONNECT_BANNER: &[u8] =
    b"ISO-TP fatal error. Disable this message from ISO-14229 configuration! ";

/// Fixed SecurityAccess seed: sub-function echo followed by the four
/// seed bytes. Intentionally constant; clients depend on this exact
/// value, so it must not be replaced with real entropy.
const SECURITY_SEED: [u8; 5] = [0x01, 0x53, 0x5F, 0xA3, 0x85];

/// The only key byte sendKey actually checks.
const EXPECTED_KEY_BYTE: u8 = 0x85;

/// Request bytes above this look like response codes and are discarded.
const MAX_REQUEST_SID: u8 = 0x3F;

/// Positive response payloads are truncated to this many bytes in logs.
const LOG_PAYLOAD_LIMIT: usize = 10;

/// How the engine reacts to transport faults (malformed, out-of-order
/// or missing frames) while waiting for a request.
#[derive(Debug, Clone, Copy, Default)]
pub enum RetryPolicy {
    /// Retry forever; a misbehaving peer never ends the session.
    #[default]
    Unbounded,
    /// Give up after this many consecutive faults. Used by tests so a
    /// misbehaving peer terminates deterministically instead of
    /// hanging the session.
    Limited(u32),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
}

/// Faults that end a diagnostic session.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("gave up after {0} consecutive transport faults")]
    RetriesExhausted(u32),
}

/// The diagnostic service engine for one connection.
///
/// Session and security state is exclusively owned here; the only
/// shared input is the read-only firmware image.
pub struct DiagnosticEngine<C> {
    tp: IsoTp<C>,
    state: DiagState,
    firmware: Arc<FirmwareImage>,
    label: String,
    config: EngineConfig,
}

impl<C: FrameChannel> DiagnosticEngine<C> {
    pub fn new(
        channel: C,
        label: impl Into<String>,
        firmware: Arc<FirmwareImage>,
        config: EngineConfig,
    ) -> Self {
        Self {
            tp: IsoTp::new(channel),
            state: DiagState::new(),
            firmware,
            label: label.into(),
            config,
        }
    }

    /// Run the receive/validate/dispatch/respond loop until the channel
    /// closes or the retry policy gives up.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        self.send(CONNECT_BANNER).await?;

        loop {
            let msg = self.receive_request().await?;
            debug!(peer = %self.label, request = %hex::encode(&msg), "request");

            let Some(&sid_byte) = msg.first() else {
                debug!(peer = %self.label, "empty message, ignoring");
                continue;
            };

            // Looks like a response code, not a request: discard
            // silently and wait for the next message.
            if sid_byte > MAX_REQUEST_SID {
                debug!(peer = %self.label, sid = format!("0x{sid_byte:02X}"), "not a request, ignoring");
                continue;
            }

            let service = match ServiceId::try_from(sid_byte) {
                Ok(service) => service,
                Err(_) => {
                    info!(peer = %self.label, sid = format!("0x{sid_byte:02X}"), "service not supported");
                    self.send(&negative_response(sid_byte, Nrc::ServiceNotSupported))
                        .await?;
                    continue;
                }
            };

            if msg.len() < 2 {
                info!(peer = %self.label, len = msg.len(), "incorrect message length");
                self.send(&negative_response(
                    sid_byte,
                    Nrc::IncorrectMessageLengthOrInvalidFormat,
                ))
                .await?;
                continue;
            }

            let outcome = match service {
                ServiceId::SessionControl => self.session_control(&msg[1..]),
                ServiceId::SecurityAccess => self.security_access(&msg[1..]),
                ServiceId::ReadMemoryByAddress => self.read_memory(&msg[1..]),
            };

            match outcome {
                Ok(data) => {
                    let shown = &data[..data.len().min(LOG_PAYLOAD_LIMIT)];
                    info!(
                        peer = %self.label,
                        service = ?service,
                        data = %hex::encode(shown),
                        "positive response"
                    );
                    self.send(&positive_response(service, &data)).await?;
                }
                Err(nrc) => {
                    info!(peer = %self.label, service = ?service, %nrc, "negative response");
                    self.send(&negative_response(service.code(), nrc)).await?;
                }
            }
        }
    }

    /// DiagnosticSessionControl (0x10): select default or extended
    /// session. Any session change relocks security, including
    /// re-entering the active session.
    fn session_control(&mut self, data: &[u8]) -> Result<Vec<u8>, Nrc> {
        let session = Session::from_sub_function(data[0]).ok_or(Nrc::SubFunctionNotSupported)?;
        self.state.enter_session(session);
        Ok(vec![data[0]])
    }

    /// SecurityAccess (0x27): requestSeed (sf 1) hands out the fixed
    /// seed; sendKey (sf 2) checks the fixed key byte. Both require the
    /// extended session.
    fn security_access(&mut self, data: &[u8]) -> Result<Vec<u8>, Nrc> {
        let sf = data[0];
        if sf != 0x01 && sf != 0x02 {
            return Err(Nrc::SubFunctionNotSupported);
        }
        if self.state.session() != Session::Extended {
            return Err(Nrc::SubFunctionNotSupportedInActiveSession);
        }

        if sf == 0x01 {
            self.state.issue_seed();
            return Ok(SECURITY_SEED.to_vec());
        }

        // sendKey: a seed must have been issued since the last session
        // change, the sub-message is sf plus exactly four key bytes,
        // and only the last key byte is checked.
        if self.state.security() != Security::SeedIssued {
            return Err(Nrc::RequestSequenceError);
        }
        if data.len() != 5 {
            return Err(Nrc::IncorrectMessageLengthOrInvalidFormat);
        }
        if data[4] != EXPECTED_KEY_BYTE {
            return Err(Nrc::InvalidKey);
        }

        self.state.unlock();
        Ok(vec![sf])
    }

    /// ReadMemoryByAddress (0x23): address-and-length format byte,
    /// big-endian address, big-endian size. Requires extended session
    /// and a completed seed/key exchange.
    fn read_memory(&mut self, data: &[u8]) -> Result<Vec<u8>, Nrc> {
        if self.state.session() != Session::Extended {
            return Err(Nrc::ServiceNotSupportedInActiveSession);
        }
        if self.state.security() != Security::Unlocked {
            return Err(Nrc::SecurityAccessDenied);
        }

        let addr_len = (data[0] >> 4) as usize;
        let size_len = (data[0] & 0x0F) as usize;
        if data.len() != 1 + addr_len + size_len {
            return Err(Nrc::IncorrectMessageLengthOrInvalidFormat);
        }

        let addr = be_uint(&data[1..1 + addr_len]);
        let size = be_uint(&data[1 + addr_len..1 + addr_len + size_len]);

        let bytes = self
            .firmware
            .read(addr, size)
            .ok_or(Nrc::RequestOutOfRange)?;
        debug!(
            peer = %self.label,
            addr = format!("0x{addr:X}"),
            size = format!("0x{size:X}"),
            "memory read"
        );
        Ok(bytes.to_vec())
    }

    /// Receive one logical message, applying the retry policy to
    /// transport faults. Channel faults end the session.
    async fn receive_request(&mut self) -> Result<Vec<u8>, EngineError> {
        let mut faults = 0u32;
        loop {
            debug!(peer = %self.label, "waiting for diagnostic request");
            match self.tp.read().await {
                Ok(msg) => return Ok(msg),
                Err(FramerError::Channel(err)) => return Err(err.into()),
                Err(err) => {
                    faults += 1;
                    debug!(peer = %self.label, %err, faults, "transport fault");
                    if let RetryPolicy::Limited(max) = self.config.retry {
                        if faults >= max {
                            return Err(EngineError::RetriesExhausted(faults));
                        }
                    }
                }
            }
        }
    }

    /// Send one logical message. A transport fault (the peer refusing
    /// flow control on a long response) drops the response and keeps
    /// the connection alive; only channel faults end the session.
    async fn send(&mut self, payload: &[u8]) -> Result<(), EngineError> {
        match self.tp.write(payload).await {
            Ok(()) => Ok(()),
            Err(FramerError::Channel(err)) => Err(err.into()),
            Err(err) => {
                warn!(peer = %self.label, %err, "response transmit aborted");
                Ok(())
            }
        }
    }
}

/// Decode a big-endian unsigned integer of up to 15 bytes.
fn be_uint(bytes: &[u8]) -> u128 {
    bytes.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128)
}

/// Run one diagnostic session over `channel` until the peer
/// disconnects. A clean disconnect is not an error.
pub async fn run_diagnostic_session<C: FrameChannel>(
    channel: C,
    label: impl Into<String>,
    firmware: Arc<FirmwareImage>,
    config: EngineConfig,
) -> Result<(), EngineError> {
    let label = label.into();
    let mut engine = DiagnosticEngine::new(channel, label.clone(), firmware, config);

    info!(peer = %label, "client connected");
    match engine.run().await {
        Err(EngineError::Channel(ChannelError::Closed)) => {
            info!(peer = %label, "client disconnected");
            Ok(())
        }
        Err(err) => {
            warn!(peer = %label, %err, "session ended");
            Err(err)
        }
        Ok(()) => Ok(()),
    }
}
