//! Shared harness for udsd integration tests
//!
//! Spawns a diagnostic engine on one end of an in-memory frame channel
//! pair and hands the test the client end, wrapped in its own framer.

use std::sync::Arc;

use tokio::task::JoinHandle;

use udsd_core::{run_diagnostic_session, EngineConfig, EngineError, FirmwareImage};
use udsd_isotp::mock::MockFrameChannel;
use udsd_isotp::IsoTp;

/// A tester connected to an in-process diagnostic engine.
pub struct TestClient {
    pub tp: IsoTp<MockFrameChannel>,
    pub engine: JoinHandle<Result<(), EngineError>>,
}

/// Spawn an engine serving `firmware` and return the connected client.
///
/// The engine transmits its connect banner immediately; most tests
/// should consume it with [`TestClient::read_banner`] before sending
/// requests.
pub fn spawn_endpoint(firmware: Vec<u8>, config: EngineConfig) -> TestClient {
    let (client, server) = MockFrameChannel::pair();
    let firmware = Arc::new(FirmwareImage::new(firmware));
    let engine = tokio::spawn(run_diagnostic_session(server, "mock-peer", firmware, config));

    TestClient {
        tp: IsoTp::new(client),
        engine,
    }
}

impl TestClient {
    /// Read the connect banner (including the reassembly padding of its
    /// final consecutive frame).
    pub async fn read_banner(&mut self) -> Vec<u8> {
        self.tp.read().await.expect("banner")
    }

    /// Send one request and read one response.
    pub async fn request(&mut self, request: &[u8]) -> Vec<u8> {
        self.tp.write(request).await.expect("request sent");
        self.tp.read().await.expect("response")
    }
}
