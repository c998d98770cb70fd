//! Correlated request/response over one backend connection.
//!
//! [`RpcClient`] owns the connection. Every outbound call gets a fresh
//! [`Token`] and parks its caller in the pending table until the matching
//! `rpc_result` arrives. Everything else the backend sends is decoded into
//! an [`Update`] and queued on the [`UpdateStream`].
//!
//! The receive loop stamps each routed item, response or push, with a
//! strictly increasing `seq`. Whoever consumes both (the login state
//! machine) can use it to tell which of two pieces of information is newer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use telecore_proto::envelope::{self, Inbound};
use telecore_proto::{Session, Token};
use telecore_tl::{Deserializable, RemoteCall};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, Link};
use crate::errors::{InvocationError, RpcError};
use crate::update::{self, Update};

// ─── Sequenced values ─────────────────────────────────────────────────────────

/// A value tagged with the position at which the receive loop saw it.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequenced<T> {
    pub seq:   u64,
    pub value: T,
}

impl<T> Sequenced<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sequenced<U> {
        Sequenced { seq: self.seq, value: f(self.value) }
    }
}

/// One pushed update together with its receive position.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateEnvelope {
    pub seq:    u64,
    pub update: Update,
}

// ─── UpdateStream ─────────────────────────────────────────────────────────────

/// Pushed updates in the order the backend sent them.
pub struct UpdateStream {
    rx: mpsc::UnboundedReceiver<UpdateEnvelope>,
}

impl UpdateStream {
    /// Wait for the next update. Returns `None` once the client has stopped
    /// or the backend hung up.
    pub async fn next(&mut self) -> Option<UpdateEnvelope> {
        self.rx.recv().await
    }
}

// ─── Connection ───────────────────────────────────────────────────────────────

type Reply = Result<Sequenced<Vec<u8>>, InvocationError>;

/// Everything that lives exactly as long as one open link.
struct Connection {
    generation: u64,
    outbound:   mpsc::UnboundedSender<Vec<u8>>,
    session:    Session,
    pending:    HashMap<Token, oneshot::Sender<Reply>>,
    updates_tx: mpsc::UnboundedSender<UpdateEnvelope>,
    updates:    Option<UpdateStream>,
    cancel:     CancellationToken,
    task:       Option<JoinHandle<()>>,
}

impl Connection {
    /// Hand `reply` to whoever waits on `token`.
    fn resolve(&mut self, token: Token, seq: u64, reply: Reply) {
        let Some(tx) = self.pending.remove(&token) else {
            tracing::debug!(token = token.0, seq, "[telecore] Response with no waiter");
            return;
        };
        if tx.send(reply).is_err() {
            tracing::debug!(token = token.0, seq, "[telecore] Caller went away");
        } else {
            tracing::debug!(token = token.0, seq, "[telecore] Response routed");
        }
    }

    fn fail_pending(&mut self) {
        let count = self.pending.len();
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(InvocationError::ConnectionClosed));
        }
        if count > 0 {
            tracing::debug!(count, "[telecore] Failed pending requests");
        }
    }
}

struct Inner {
    backend:    Arc<dyn Backend>,
    state:      Mutex<Option<Connection>>,
    seq:        AtomicU64,
    generation: AtomicU64,
}

// ─── RpcClient ────────────────────────────────────────────────────────────────

/// Handle to the backend connection. Cheap to clone.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

impl RpcClient {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                state:      Mutex::new(None),
                seq:        AtomicU64::new(0),
                generation: AtomicU64::new(0),
            }),
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────────────

    /// Open the connection and start the receive loop. No-op when running.
    pub async fn start(&self) -> Result<(), InvocationError> {
        let mut state = self.inner.state.lock().await;
        if state.is_some() {
            return Ok(());
        }

        let name = self.inner.backend.name().to_string();
        tracing::info!("[telecore] Connecting via {name} backend …");
        let Link { outbound, inbound } = self.inner.backend.open().await?;

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        // The loop blocks on `state` until the connection below is in place.
        let task = tokio::spawn(receive_loop(
            Arc::downgrade(&self.inner),
            generation,
            inbound,
            cancel.clone(),
        ));

        *state = Some(Connection {
            generation,
            outbound,
            session: Session::new(),
            pending: HashMap::new(),
            updates_tx,
            updates: Some(UpdateStream { rx: updates_rx }),
            cancel,
            task: Some(task),
        });
        tracing::info!("[telecore] Connected via {name} ✓");
        Ok(())
    }

    /// Close the connection, fail every pending call with
    /// [`InvocationError::ConnectionClosed`] and close the update stream.
    /// No-op when not running.
    pub async fn stop(&self) {
        let Some(mut conn) = self.inner.state.lock().await.take() else {
            return;
        };
        conn.cancel.cancel();
        conn.fail_pending();
        let task = conn.task.take();
        drop(conn);

        if let Some(task) = task {
            let _ = task.await;
        }
        tracing::info!("[telecore] Stopped ✓");
    }

    pub async fn is_running(&self) -> bool {
        self.inner.state.lock().await.is_some()
    }

    /// Take the update stream of the current connection.
    ///
    /// There is one stream per [`start`](Self::start); `None` if it was
    /// already taken or the client is not running.
    pub async fn updates(&self) -> Option<UpdateStream> {
        self.inner.state.lock().await.as_mut().and_then(|c| c.updates.take())
    }

    // ── Calls ──────────────────────────────────────────────────────────────

    /// Send `req` and wait for its response.
    ///
    /// No timeout is applied; wrap the call in `tokio::time::timeout` if
    /// you need a deadline.
    pub async fn invoke<R: RemoteCall>(&self, req: &R) -> Result<R::Return, InvocationError> {
        self.invoke_sequenced(req).await.map(|s| s.value)
    }

    /// Like [`invoke`](Self::invoke), also returning the receive position of
    /// the response.
    pub async fn invoke_sequenced<R: RemoteCall>(
        &self,
        req: &R,
    ) -> Result<Sequenced<R::Return>, InvocationError> {
        let rx = {
            let mut state = self.inner.state.lock().await;
            let conn = state.as_mut().ok_or(InvocationError::NotRunning)?;

            let msg = conn.session.pack(req);
            let (tx, rx) = oneshot::channel();
            let previous = conn.pending.insert(msg.token, tx);
            debug_assert!(previous.is_none(), "token {:?} reused", msg.token);

            if conn.outbound.send(msg.to_bytes()).is_err() {
                conn.pending.remove(&msg.token);
                return Err(InvocationError::ConnectionClosed);
            }
            tracing::debug!(token = msg.token.0, "[telecore] Request sent");
            rx
        };

        let reply = rx.await.map_err(|_| InvocationError::ConnectionClosed)??;
        let value = R::Return::from_bytes(&reply.value)?;
        Ok(Sequenced { seq: reply.seq, value })
    }

    // ── Diagnostics ────────────────────────────────────────────────────────

    /// Tokens of calls still waiting for a response, ascending.
    pub async fn pending_tokens(&self) -> Vec<Token> {
        let state = self.inner.state.lock().await;
        let mut tokens: Vec<Token> = state
            .as_ref()
            .map(|c| c.pending.keys().copied().collect())
            .unwrap_or_default();
        tokens.sort();
        tokens
    }

    /// The `seq` of the most recently routed item, `0` before the first.
    pub fn last_seq(&self) -> u64 {
        self.inner.seq.load(Ordering::SeqCst)
    }
}

// ─── Receive loop ─────────────────────────────────────────────────────────────

async fn receive_loop(
    inner:       Weak<Inner>,
    generation:  u64,
    mut inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    cancel:      CancellationToken,
) {
    loop {
        let raw = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            raw = inbound.recv() => raw,
        };
        let Some(inner) = inner.upgrade() else { return };
        match raw {
            Some(raw) => inner.route(generation, raw).await,
            None => {
                inner.teardown(generation).await;
                return;
            }
        }
    }
}

impl Inner {
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn route(&self, generation: u64, raw: Vec<u8>) {
        let items = match envelope::unwrap_envelope(raw) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("[telecore] Dropping undecodable payload: {e}");
                return;
            }
        };

        let mut state = self.state.lock().await;
        let Some(conn) = state.as_mut().filter(|c| c.generation == generation) else {
            return;
        };

        for item in items {
            let seq = self.next_seq();
            match item {
                Inbound::Result { token, body } => {
                    let reply = body
                        .map(|value| Sequenced { seq, value })
                        .map_err(|f| InvocationError::Rpc(RpcError::from_wire(f.code, &f.message)));
                    conn.resolve(token, seq, reply);
                }
                Inbound::Undecodable { token, reason } => {
                    tracing::warn!(token = token.0, seq, "[telecore] Undecodable response: {reason}");
                    conn.resolve(token, seq, Err(InvocationError::Deserialize(reason)));
                }
                Inbound::Push(bytes) => match update::parse(&bytes) {
                    Ok(Some(update)) => {
                        tracing::debug!(seq, "[telecore] Update queued");
                        let _ = conn.updates_tx.send(UpdateEnvelope { seq, update });
                    }
                    Ok(None) => tracing::trace!(seq, "[telecore] Ignoring unknown push"),
                    Err(e) => tracing::warn!(seq, "[telecore] Dropping malformed push: {e}"),
                },
            }
        }
    }

    /// The backend closed the link on its own.
    async fn teardown(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if state.as_ref().is_some_and(|c| c.generation == generation) {
            if let Some(mut conn) = state.take() {
                tracing::warn!("[telecore] Backend closed the connection");
                conn.fail_pending();
            }
        }
    }
}
