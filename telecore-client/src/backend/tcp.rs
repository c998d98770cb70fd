//! TCP backend with intermediate framing.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use telecore_proto::transport::{encode_frame, FrameDecoder, INIT};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

use super::{Backend, Link};
use crate::socks5::Socks5Config;

// ─── Config ───────────────────────────────────────────────────────────────────

/// Where and how [`TcpBackend`] connects.
#[derive(Clone, Debug)]
pub struct TcpConfig {
    /// `host:port` of the backend.
    pub addr:            String,
    /// Optional SOCKS5 proxy every connection is tunnelled through.
    pub socks5:          Option<Socks5Config>,
    /// Give up on a connection attempt after this long.
    pub connect_timeout: Duration,
    /// TCP keep-alive idle time; `None` leaves the OS default.
    pub keepalive:       Option<Duration>,
}

impl TcpConfig {
    /// Defaults for everything except the address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), ..Default::default() }
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            addr:            String::new(),
            socks5:          None,
            connect_timeout: Duration::from_secs(10),
            keepalive:       Some(Duration::from_secs(60)),
        }
    }
}

// ─── TcpBackend ───────────────────────────────────────────────────────────────

/// Talks to a real backend over TCP.
///
/// Each connection gets one reader task and one writer task. The reader
/// closes the inbound channel on EOF or on any read/framing error, which the
/// RPC client treats as the connection being torn down.
pub struct TcpBackend {
    config: TcpConfig,
}

impl TcpBackend {
    pub fn new(config: TcpConfig) -> Self {
        Self { config }
    }

    async fn connect_stream(&self) -> io::Result<TcpStream> {
        let addr = self.config.addr.as_str();
        let connect = async {
            match &self.config.socks5 {
                Some(proxy) => proxy.connect(addr).await,
                None        => TcpStream::connect(addr).await,
            }
        };
        let stream = tokio::time::timeout(self.config.connect_timeout, connect)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, format!("connect to {addr} timed out")))??;

        stream.set_nodelay(true)?;
        if let Some(idle) = self.config.keepalive {
            SockRef::from(&stream).set_tcp_keepalive(&TcpKeepalive::new().with_time(idle))?;
        }
        Ok(stream)
    }
}

#[async_trait]
impl Backend for TcpBackend {
    async fn open(&self) -> io::Result<Link> {
        tracing::info!("[telecore] Connecting to {} …", self.config.addr);
        let stream = self.connect_stream().await?;
        let (reader, writer) = stream.into_split();

        let (client, server) = Link::pair();
        tokio::spawn(write_loop(writer, server.inbound));
        tokio::spawn(read_loop(reader, server.outbound));

        tracing::info!("[telecore] Connected to {} ✓", self.config.addr);
        Ok(client)
    }

    fn name(&self) -> &str { "tcp" }
}

async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    if let Err(e) = writer.write_all(&INIT).await {
        tracing::warn!("[telecore] Writing transport init failed: {e}");
        return;
    }
    while let Some(payload) = rx.recv().await {
        if let Err(e) = writer.write_all(&encode_frame(&payload)).await {
            tracing::warn!("[telecore] Write failed: {e}");
            return;
        }
    }
    // Client side dropped its sender: half-close so the peer sees EOF.
    let _ = writer.shutdown().await;
}

async fn read_loop(mut reader: OwnedReadHalf, tx: mpsc::UnboundedSender<Vec<u8>>) {
    let mut decoder = FrameDecoder::new();
    let mut chunk = vec![0u8; 16 * 1024];
    loop {
        let read = tokio::select! {
            r = reader.read(&mut chunk) => r,
            _ = tx.closed() => return,
        };
        let n = match read {
            Ok(0) => {
                tracing::info!("[telecore] Backend closed the connection");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("[telecore] Read failed: {e}");
                return;
            }
        };
        decoder.extend(&chunk[..n]);
        loop {
            match decoder.next_frame() {
                Ok(Some(frame)) => {
                    if tx.send(frame).is_err() { return; }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("[telecore] Dropping connection: {e}");
                    return;
                }
            }
        }
    }
}
