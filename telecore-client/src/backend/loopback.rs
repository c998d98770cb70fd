//! In-process backend whose far end is driven by the caller.

use std::io;

use async_trait::async_trait;
use telecore_proto::{envelope, Message, Token};
use telecore_tl::Serializable;
use tokio::sync::mpsc;

use super::{Backend, Link};

/// Every [`Backend::open`] produces a [`LoopbackPeer`] on the paired
/// [`LoopbackAcceptor`].
pub struct LoopbackBackend {
    peers: mpsc::UnboundedSender<LoopbackPeer>,
}

impl LoopbackBackend {
    pub fn new() -> (Self, LoopbackAcceptor) {
        let (peers, rx) = mpsc::unbounded_channel();
        (Self { peers }, LoopbackAcceptor { rx })
    }
}

#[async_trait]
impl Backend for LoopbackBackend {
    async fn open(&self) -> io::Result<Link> {
        let (client, server) = Link::pair();
        self.peers
            .send(LoopbackPeer { link: server })
            .map_err(|_| io::Error::new(io::ErrorKind::ConnectionRefused, "loopback acceptor dropped"))?;
        Ok(client)
    }

    fn name(&self) -> &str { "loopback" }
}

/// Receives the backend side of each opened connection.
pub struct LoopbackAcceptor {
    rx: mpsc::UnboundedReceiver<LoopbackPeer>,
}

impl LoopbackAcceptor {
    /// Wait for the next connection. `None` once the backend is dropped.
    pub async fn accept(&mut self) -> Option<LoopbackPeer> {
        self.rx.recv().await
    }
}

/// The backend end of one loopback connection.
///
/// Dropping it tears the connection down from the client's point of view.
pub struct LoopbackPeer {
    link: Link,
}

impl LoopbackPeer {
    /// Next raw payload the client sent. `None` once the client hung up.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.link.inbound.recv().await
    }

    /// Next request the client sent, split into token and body.
    pub async fn recv_request(&mut self) -> Option<Message> {
        while let Some(raw) = self.recv().await {
            match Message::from_bytes(&raw) {
                Ok(msg) => return Some(msg),
                Err(e) => tracing::warn!("[loopback] Ignoring non-request payload: {e}"),
            }
        }
        None
    }

    /// Send an arbitrary payload. `false` if the client is gone.
    pub fn send_raw(&self, payload: Vec<u8>) -> bool {
        self.link.outbound.send(payload).is_ok()
    }

    /// Answer `token` with `value`.
    pub fn respond<T: Serializable>(&self, token: Token, value: &T) -> bool {
        self.send_raw(envelope::encode_result(token, &value.to_bytes()))
    }

    /// Answer `token` with an API error.
    pub fn fail(&self, token: Token, code: i32, message: &str) -> bool {
        self.send_raw(envelope::encode_error(token, code, message))
    }

    /// Push an unsolicited update.
    pub fn push<T: Serializable>(&self, update: &T) -> bool {
        self.send_raw(update.to_bytes())
    }

    /// Close the connection.
    pub fn close(self) {}
}
