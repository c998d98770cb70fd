//! Fan-out of pushed updates to per-category delegates.
//!
//! The [`Dispatcher`] holds one optional delegate per category and no other
//! state. Its consume loop takes one [`UpdateEnvelope`] at a time and awaits
//! every delegate it hands the envelope to before reading the next one, so
//! a slow delegate holds back later updates instead of reordering them.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use telecore_tl as tl;
use tokio::task::JoinHandle;

use crate::auth::AuthorizationState;
use crate::rpc::{UpdateEnvelope, UpdateStream};
use crate::update::{ChatUpdate, ConnectionState, Message, MessageDeletion, MessageEdit, Update};

// ─── Events ───────────────────────────────────────────────────────────────────

/// What the authorization delegate receives. Carries the receive `seq` so
/// the receiver can order it against direct call results.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthUpdate {
    AuthorizationState { seq: u64, state: AuthorizationState },
    ConnectionState { seq: u64, state: ConnectionState },
}

#[derive(Clone, Debug, PartialEq)]
pub enum MessageUpdate {
    New(Message),
    Edited(MessageEdit),
    Deleted(MessageDeletion),
}

#[derive(Clone, Debug, PartialEq)]
pub enum UserUpdate {
    Changed(tl::types::User),
    Status { user_id: i64, status: tl::enums::UserStatus },
}

// ─── Delegate ─────────────────────────────────────────────────────────────────

/// Receives the updates of one category.
#[async_trait]
pub trait Delegate<E: Send + 'static>: Send + Sync {
    async fn handle(&self, event: E);
}

/// A [`Delegate`] backed by an async closure. See [`delegate_fn`].
pub struct FnDelegate<F>(F);

#[async_trait]
impl<E, F, Fut> Delegate<E> for FnDelegate<F>
where
    E:   Send + 'static,
    F:   Fn(E) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn handle(&self, event: E) {
        (self.0)(event).await
    }
}

/// Wrap an async closure as a delegate.
///
/// ```rust
/// use telecore_client::dispatcher::{delegate_fn, MessageUpdate};
///
/// let delegate = delegate_fn(|event: MessageUpdate| async move {
///     println!("{event:?}");
/// });
/// # let _ = delegate;
/// ```
pub fn delegate_fn<E, F, Fut>(f: F) -> Arc<dyn Delegate<E>>
where
    E:   Send + 'static,
    F:   Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnDelegate(f))
}

// ─── Dispatcher ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct Slots {
    auth:    Option<Arc<dyn Delegate<AuthUpdate>>>,
    chat:    Option<Arc<dyn Delegate<ChatUpdate>>>,
    message: Option<Arc<dyn Delegate<MessageUpdate>>>,
    user:    Option<Arc<dyn Delegate<UserUpdate>>>,
    file:    Option<Arc<dyn Delegate<tl::types::File>>>,
    call:    Option<Arc<dyn Delegate<tl::types::Call>>>,
}

/// Routes updates to the delegate registered for their category.
///
/// At most one delegate per category; setting a new one replaces the old
/// and `None` clears the slot. Cheap to clone; clones share the slots.
#[derive(Clone, Default)]
pub struct Dispatcher {
    slots: Arc<RwLock<Slots>>,
}

impl Dispatcher {
    pub fn new() -> Self { Self::default() }

    // ── Registration ───────────────────────────────────────────────────────

    /// Authorization and connection state changes.
    pub fn set_auth_delegate(&self, delegate: Option<Arc<dyn Delegate<AuthUpdate>>>) {
        self.write(|s| s.auth = delegate);
    }

    pub fn set_chat_delegate(&self, delegate: Option<Arc<dyn Delegate<ChatUpdate>>>) {
        self.write(|s| s.chat = delegate);
    }

    pub fn set_message_delegate(&self, delegate: Option<Arc<dyn Delegate<MessageUpdate>>>) {
        self.write(|s| s.message = delegate);
    }

    pub fn set_user_delegate(&self, delegate: Option<Arc<dyn Delegate<UserUpdate>>>) {
        self.write(|s| s.user = delegate);
    }

    pub fn set_file_delegate(&self, delegate: Option<Arc<dyn Delegate<tl::types::File>>>) {
        self.write(|s| s.file = delegate);
    }

    pub fn set_call_delegate(&self, delegate: Option<Arc<dyn Delegate<tl::types::Call>>>) {
        self.write(|s| s.call = delegate);
    }

    fn write(&self, f: impl FnOnce(&mut Slots)) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut slots);
    }

    /// Clone a delegate out so no lock is held across its `await`.
    fn read<T>(&self, f: impl FnOnce(&Slots) -> Option<T>) -> Option<T> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        f(&slots)
    }

    // ── Dispatch ───────────────────────────────────────────────────────────

    /// Deliver one envelope and wait until every receiving delegate is done.
    ///
    /// A new message goes to the message delegate first and then to the
    /// chat delegate as that chat's new last message.
    pub async fn handle_update(&self, envelope: UpdateEnvelope) {
        let UpdateEnvelope { seq, update } = envelope;
        match update {
            Update::AuthorizationState(state) => {
                if let Some(d) = self.read(|s| s.auth.clone()) {
                    d.handle(AuthUpdate::AuthorizationState { seq, state }).await;
                }
            }
            Update::ConnectionState(state) => {
                if let Some(d) = self.read(|s| s.auth.clone()) {
                    d.handle(AuthUpdate::ConnectionState { seq, state }).await;
                }
            }
            Update::NewMessage(message) => {
                let chat_id = message.chat_id();
                if let Some(d) = self.read(|s| s.message.clone()) {
                    d.handle(MessageUpdate::New(message.clone())).await;
                }
                // Looked up only now: the slot may have changed meanwhile.
                if let Some(d) = self.read(|s| s.chat.clone()) {
                    d.handle(ChatUpdate::LastMessageChanged { chat_id, message: Some(message) }).await;
                }
            }
            Update::MessageEdited(edit) => {
                if let Some(d) = self.read(|s| s.message.clone()) {
                    d.handle(MessageUpdate::Edited(edit)).await;
                }
            }
            Update::MessagesDeleted(deletion) => {
                if let Some(d) = self.read(|s| s.message.clone()) {
                    d.handle(MessageUpdate::Deleted(deletion)).await;
                }
            }
            Update::Chat(chat) => {
                if let Some(d) = self.read(|s| s.chat.clone()) {
                    d.handle(chat).await;
                }
            }
            Update::User(user) => {
                if let Some(d) = self.read(|s| s.user.clone()) {
                    d.handle(UserUpdate::Changed(user)).await;
                }
            }
            Update::UserStatus { user_id, status } => {
                if let Some(d) = self.read(|s| s.user.clone()) {
                    d.handle(UserUpdate::Status { user_id, status }).await;
                }
            }
            Update::File(file) => {
                if let Some(d) = self.read(|s| s.file.clone()) {
                    d.handle(file).await;
                }
            }
            Update::Call(call) => {
                if let Some(d) = self.read(|s| s.call.clone()) {
                    d.handle(call).await;
                }
            }
        }
    }

    /// Consume `stream` until it closes.
    pub async fn run(&self, mut stream: UpdateStream) {
        tracing::debug!("[telecore] Dispatcher running");
        while let Some(envelope) = stream.next().await {
            self.handle_update(envelope).await;
        }
        tracing::debug!("[telecore] Update stream closed, dispatcher done");
    }

    /// [`run`](Self::run) on a background task.
    pub fn spawn(&self, stream: UpdateStream) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.run(stream).await })
    }
}
