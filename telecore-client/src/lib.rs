//! # telecore-client
//!
//! Async client core for a Telegram-style RPC + push backend.
//!
//! ## Features
//! - One connection shared by correlated requests and unsolicited pushes
//! - Responses paired with their callers by token, whatever order they arrive in
//! - Pushed updates decoded and fanned out to per-category delegates, in order
//! - Login state machine (phone, code, password, registration, logout) with
//!   single-flight operations and observable state
//! - Swappable backends: TCP (optionally over SOCKS5), an in-memory fake and a
//!   scriptable loopback for tests
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use telecore_client::{AuthorizationState, Client, Config, FakeConfig};
//!
//! # async fn f() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect(Config::fake(FakeConfig::default())).await?;
//! let auth = client.auth();
//!
//! auth.send_phone_number("+15551234567").await?;
//! auth.verify_code("12345").await?;
//! assert_eq!(auth.state(), AuthorizationState::Authorized);
//!
//! client.shutdown().await;
//! # Ok(()) }
//! ```

#![deny(unsafe_code)]

mod errors;
pub mod auth;
pub mod backend;
pub mod dispatcher;
pub mod rpc;
pub mod socks5;
pub mod update;

pub use auth::{AuthStateMachine, AuthorizationState, CodeInfo, CodeType};
pub use backend::{Backend, FakeBackend, FakeConfig, Link, LoopbackBackend, TcpBackend, TcpConfig};
pub use dispatcher::{delegate_fn, AuthUpdate, Delegate, Dispatcher, MessageUpdate, UserUpdate};
pub use errors::{AuthError, InvocationError, RpcError};
pub use rpc::{RpcClient, Sequenced, UpdateEnvelope, UpdateStream};
pub use socks5::Socks5Config;
pub use update::{ChatUpdate, ConnectionState, Update};

use std::sync::{Arc, Mutex, PoisonError};

use telecore_tl as tl;
use tokio::task::JoinHandle;

// ─── Config ───────────────────────────────────────────────────────────────────

/// Configuration for [`Client::connect`].
#[derive(Clone)]
pub struct Config {
    /// Where requests go. Defaults to the in-memory [`FakeBackend`].
    pub backend: Arc<dyn Backend>,
}

impl Config {
    /// A real TCP connection.
    pub fn tcp(config: TcpConfig) -> Self {
        Self { backend: Arc::new(TcpBackend::new(config)) }
    }

    /// The simulated backend.
    pub fn fake(config: FakeConfig) -> Self {
        Self { backend: Arc::new(FakeBackend::new(config)) }
    }

    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

impl Default for Config {
    fn default() -> Self { Self::fake(FakeConfig::default()) }
}

// ─── Client ───────────────────────────────────────────────────────────────────

struct ClientInner {
    rpc:        RpcClient,
    dispatcher: Dispatcher,
    auth:       AuthStateMachine,
    dispatch:   Mutex<Option<JoinHandle<()>>>,
}

/// The pieces wired together. Cheap to clone.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Start the connection, route updates through a fresh [`Dispatcher`]
    /// with the [`AuthStateMachine`] as its authorization delegate, and fetch
    /// the current authorization state.
    pub async fn connect(config: Config) -> Result<Self, InvocationError> {
        let rpc = RpcClient::new(config.backend);
        rpc.start().await?;

        let dispatcher = Dispatcher::new();
        let auth = AuthStateMachine::new(rpc.clone());
        dispatcher.set_auth_delegate(Some(Arc::new(auth.clone())));

        let client = Self {
            inner: Arc::new(ClientInner { rpc, dispatcher, auth, dispatch: Mutex::new(None) }),
        };
        client.attach().await?;
        Ok(client)
    }

    /// Open a fresh connection after the backend hung up (or at any time),
    /// point the dispatcher at its update stream and re-fetch the
    /// authorization state. Delegates stay registered.
    pub async fn reconnect(&self) -> Result<(), InvocationError> {
        tracing::info!("[telecore] Reconnecting …");
        self.inner.rpc.stop().await;
        self.join_dispatcher().await;
        self.inner.rpc.start().await?;
        self.attach().await
    }

    /// Spawn the dispatcher on the current update stream and refresh.
    async fn attach(&self) -> Result<(), InvocationError> {
        let task = self.inner.rpc.updates().await.map(|stream| self.inner.dispatcher.spawn(stream));
        *self.inner.dispatch.lock().unwrap_or_else(PoisonError::into_inner) = task;

        match self.inner.auth.refresh().await {
            Ok(state) => tracing::info!("[telecore] Ready ✓ ({state:?})"),
            Err(AuthError::Network(e)) => {
                self.shutdown().await;
                return Err(Arc::try_unwrap(e).unwrap_or(InvocationError::ConnectionClosed));
            }
            Err(e) => tracing::warn!("[telecore] Could not fetch authorization state: {e}"),
        }
        Ok(())
    }

    async fn join_dispatcher(&self) {
        let task = self.inner.dispatch.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    pub fn rpc(&self) -> &RpcClient { &self.inner.rpc }

    /// Register delegates for the non-authorization categories here.
    pub fn dispatcher(&self) -> &Dispatcher { &self.inner.dispatcher }

    pub fn auth(&self) -> &AuthStateMachine { &self.inner.auth }

    /// Fetch the logged-in user.
    pub async fn get_me(&self) -> Result<tl::types::User, InvocationError> {
        let tl::enums::User::User(user) = self.inner.rpc.invoke(&tl::functions::GetMe {}).await?;
        Ok(user)
    }

    /// Stop the connection and wait for the dispatcher to drain.
    pub async fn shutdown(&self) {
        self.inner.rpc.stop().await;
        self.join_dispatcher().await;
        tracing::info!("[telecore] Shut down ✓");
    }
}
