//! SOCKS5 proxy connector.
//!
//! Attach a [`Socks5Config`] to a [`crate::TcpConfig`] and every connection
//! the TCP backend opens is tunnelled through the proxy.
//!
//! # Example
//! ```rust,no_run
//! use telecore_client::{Socks5Config, TcpConfig};
//!
//! let cfg = TcpConfig {
//!     socks5: Some(Socks5Config::new("127.0.0.1:1080")),
//!     ..TcpConfig::new("203.0.113.7:443")
//! };
//! ```

use std::io;

use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;

/// SOCKS5 proxy configuration.
#[derive(Clone, Debug)]
pub struct Socks5Config {
    /// Host:port of the SOCKS5 proxy server.
    pub proxy_addr: String,
    /// Optional username and password for proxy authentication.
    pub auth:       Option<(String, String)>,
}

impl Socks5Config {
    /// Create an unauthenticated SOCKS5 config.
    pub fn new(proxy_addr: impl Into<String>) -> Self {
        Self { proxy_addr: proxy_addr.into(), auth: None }
    }

    /// Create a SOCKS5 config with username/password authentication.
    pub fn with_auth(
        proxy_addr: impl Into<String>,
        username:   impl Into<String>,
        password:   impl Into<String>,
    ) -> Self {
        Self {
            proxy_addr: proxy_addr.into(),
            auth:       Some((username.into(), password.into())),
        }
    }

    /// Parse `[user:pass@]host:port`, the form accepted in `TELECORE_SOCKS5`.
    pub fn parse(proxy: &str) -> Self {
        match proxy.rsplit_once('@') {
            Some((creds, addr)) => match creds.split_once(':') {
                Some((user, pass)) => Self::with_auth(addr, user, pass),
                None => Self::new(addr),
            },
            None => Self::new(proxy),
        }
    }

    /// Establish a TCP connection to `target` through this proxy.
    pub async fn connect(&self, target: &str) -> io::Result<TcpStream> {
        tracing::info!("[socks5] Connecting via {} → {target}", self.proxy_addr);
        let stream = match &self.auth {
            None => Socks5Stream::connect(self.proxy_addr.as_str(), target).await,
            Some((user, pass)) => {
                Socks5Stream::connect_with_password(
                    self.proxy_addr.as_str(),
                    target,
                    user.as_str(),
                    pass.as_str(),
                )
                .await
            }
        }
        .map_err(io::Error::other)?;
        tracing::info!("[socks5] Connected ✓");
        Ok(stream.into_inner())
    }
}
