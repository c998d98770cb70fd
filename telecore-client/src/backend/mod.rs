//! Swappable backends behind one contract.
//!
//! A [`Backend`] knows how to open a connection and nothing else: it hands
//! back a [`Link`] of two payload channels. Correlation, routing and update
//! decoding stay in [`crate::RpcClient`], which never asks which backend it
//! is talking to.
//!
//! Three backends ship with the crate:
//! * [`TcpBackend`]: a real socket (optionally via SOCKS5) with intermediate framing.
//! * [`FakeBackend`]: an in-memory simulated auth server.
//! * [`LoopbackBackend`]: hands the far end of each connection to the caller,
//!   who scripts the backend side byte for byte.

use std::io;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod fake;
pub mod loopback;
pub mod tcp;

pub use fake::{FakeBackend, FakeConfig};
pub use loopback::{LoopbackAcceptor, LoopbackBackend, LoopbackPeer};
pub use tcp::{TcpBackend, TcpConfig};

// ─── Link ─────────────────────────────────────────────────────────────────────

/// One open connection, seen as whole payloads.
///
/// Dropping `outbound` asks the backend to close. The backend signals that
/// the connection is gone by closing `inbound`.
#[derive(Debug)]
pub struct Link {
    /// Request payloads towards the backend.
    pub outbound: mpsc::UnboundedSender<Vec<u8>>,
    /// Response and push payloads from the backend, in arrival order.
    pub inbound:  mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Link {
    /// A connected pair: the `Link` for the client and the mirrored one for
    /// whoever plays the backend.
    pub fn pair() -> (Link, Link) {
        let (to_backend, from_client) = mpsc::unbounded_channel();
        let (to_client, from_backend) = mpsc::unbounded_channel();
        (
            Link { outbound: to_backend, inbound: from_backend },
            Link { outbound: to_client, inbound: from_client },
        )
    }
}

// ─── Trait ────────────────────────────────────────────────────────────────────

/// Opens connections to the remote RPC + push service.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Open a fresh connection.
    async fn open(&self) -> io::Result<Link>;

    /// Human-readable name of this backend (for log messages).
    fn name(&self) -> &str;
}
