//! Diagnostic service engine
//!
//! Owns per-connection session and security state, dispatches incoming
//! UDS requests to the three supported services and produces positive
//! or negative responses:
//!
//! - 0x10 DiagnosticSessionControl
//! - 0x23 ReadMemoryByAddress
//! - 0x27 SecurityAccess
//!
//! Memory reads are gated behind the extended session and a completed
//! seed/key exchange. The firmware image is loaded once at process
//! start and shared read-only across connections.

mod engine;
mod firmware;
mod nrc;
mod service;
mod state;

pub use engine::{
    run_diagnostic_session, DiagnosticEngine, EngineConfig, EngineError, RetryPolicy,
    CONNECT_BANNER,
};
pub use firmware::{FirmwareImage, MEM_BASE};
pub use nrc::Nrc;
pub use service::{negative_response, positive_response, ServiceId, NEGATIVE_RESPONSE_SID};
pub use state::{DiagState, Security, Session};
