//! High-level update types delivered through [`crate::RpcClient::updates`].
//!
//! Every push the backend sends is decoded into one of the variants of
//! [`Update`]. Pushes with a constructor this crate does not know are
//! dropped before they get here.

use chrono::{DateTime, Utc};
use telecore_tl as tl;
use telecore_tl::deserialize;
use telecore_tl::Deserializable;

use crate::auth::AuthorizationState;

// ─── Message ──────────────────────────────────────────────────────────────────

/// A new message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The underlying wire object.
    pub raw: tl::types::Message,
}

impl Message {
    pub(crate) fn from_raw(raw: tl::enums::Message) -> Self {
        let tl::enums::Message::Message(raw) = raw;
        Self { raw }
    }

    /// Message ID, unique within its chat.
    pub fn id(&self) -> i64 { self.raw.id }

    /// Chat the message was posted in.
    pub fn chat_id(&self) -> i64 { self.raw.chat_id }

    pub fn sender_user_id(&self) -> i64 { self.raw.sender_user_id }

    /// The message text, `None` when empty.
    pub fn text(&self) -> Option<&str> {
        if self.raw.text.is_empty() { None } else { Some(&self.raw.text) }
    }

    /// `true` if the logged-in account sent it.
    pub fn outgoing(&self) -> bool { self.raw.is_outgoing }

    /// When the message was sent.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.raw.date as i64, 0)
    }

    /// When the message was last edited, if ever.
    pub fn edit_date(&self) -> Option<DateTime<Utc>> {
        self.raw.edit_date.and_then(|d| DateTime::from_timestamp(d as i64, 0))
    }
}

// ─── MessageEdit / MessageDeletion ────────────────────────────────────────────

/// The text of an existing message changed.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEdit {
    pub chat_id:    i64,
    pub message_id: i64,
    pub text:       String,
    /// Unix timestamp of the edit.
    pub edit_date:  i32,
}

/// One or more messages were deleted from a chat.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDeletion {
    pub chat_id:     i64,
    pub message_ids: Vec<i64>,
    /// `false` when the messages only left the local cache.
    pub permanent:   bool,
}

// ─── ChatUpdate ───────────────────────────────────────────────────────────────

/// Something about a chat changed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    /// A chat became known to the client.
    New(tl::types::Chat),
    TitleChanged { chat_id: i64, title: String },
    /// The chat's last message is now `message` (`None` if the chat is empty).
    LastMessageChanged { chat_id: i64, message: Option<Message> },
    UnreadCountChanged { chat_id: i64, last_read_inbox_message_id: i64, unread_count: i32 },
}

impl ChatUpdate {
    /// The chat this update refers to.
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::New(chat)                            => chat.id,
            Self::TitleChanged { chat_id, .. }
            | Self::LastMessageChanged { chat_id, .. }
            | Self::UnreadCountChanged { chat_id, .. } => *chat_id,
        }
    }
}

// ─── ConnectionState ──────────────────────────────────────────────────────────

/// State of the backend's own connection, as it reports it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    WaitingForNetwork,
    ConnectingToProxy,
    #[default]
    Connecting,
    Updating,
    Ready,
}

impl From<tl::enums::ConnectionState> for ConnectionState {
    fn from(state: tl::enums::ConnectionState) -> Self {
        use tl::enums::ConnectionState as S;
        match state {
            S::WaitingForNetwork(_) => Self::WaitingForNetwork,
            S::ConnectingToProxy(_) => Self::ConnectingToProxy,
            S::Connecting(_)        => Self::Connecting,
            S::Updating(_)          => Self::Updating,
            S::Ready(_)             => Self::Ready,
        }
    }
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// An event the backend pushed without being asked.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// The backend's connection state changed.
    ConnectionState(ConnectionState),
    /// The login state changed.
    AuthorizationState(AuthorizationState),
    NewMessage(Message),
    MessageEdited(MessageEdit),
    MessagesDeleted(MessageDeletion),
    Chat(ChatUpdate),
    User(tl::types::User),
    UserStatus { user_id: i64, status: tl::enums::UserStatus },
    File(tl::types::File),
    Call(tl::types::Call),
}

impl From<tl::enums::Update> for Update {
    fn from(upd: tl::enums::Update) -> Self {
        use tl::enums::Update as U;
        match upd {
            U::AuthorizationState(u) => Self::AuthorizationState(u.authorization_state.into()),
            U::ConnectionState(u)    => Self::ConnectionState(u.state.into()),
            U::NewMessage(u)         => Self::NewMessage(Message::from_raw(u.message)),
            U::MessageContent(u)     => Self::MessageEdited(MessageEdit {
                chat_id:    u.chat_id,
                message_id: u.message_id,
                text:       u.text,
                edit_date:  u.edit_date,
            }),
            U::DeleteMessages(u) => Self::MessagesDeleted(MessageDeletion {
                chat_id:     u.chat_id,
                message_ids: u.message_ids,
                permanent:   u.is_permanent,
            }),
            U::NewChat(u) => {
                let tl::enums::Chat::Chat(chat) = u.chat;
                Self::Chat(ChatUpdate::New(chat))
            }
            U::ChatTitle(u) => Self::Chat(ChatUpdate::TitleChanged { chat_id: u.chat_id, title: u.title }),
            U::ChatLastMessage(u) => Self::Chat(ChatUpdate::LastMessageChanged {
                chat_id: u.chat_id,
                message: u.last_message.map(Message::from_raw),
            }),
            U::ChatReadInbox(u) => Self::Chat(ChatUpdate::UnreadCountChanged {
                chat_id:                    u.chat_id,
                last_read_inbox_message_id: u.last_read_inbox_message_id,
                unread_count:               u.unread_count,
            }),
            U::User(u) => {
                let tl::enums::User::User(user) = u.user;
                Self::User(user)
            }
            U::UserStatus(u) => Self::UserStatus { user_id: u.user_id, status: u.status },
            U::File(u) => {
                let tl::enums::File::File(file) = u.file;
                Self::File(file)
            }
            U::Call(u) => {
                let tl::enums::Call::Call(call) = u.call;
                Self::Call(call)
            }
        }
    }
}

// ─── Parser ───────────────────────────────────────────────────────────────────

/// Decode one pushed payload.
///
/// `Ok(None)` means the constructor is not an update this crate knows,
/// which is expected from newer backends. `Err` means it claimed to be a
/// known update but did not decode.
pub(crate) fn parse(bytes: &[u8]) -> Result<Option<Update>, deserialize::Error> {
    let id = u32::from_bytes(bytes)?;
    if !tl::enums::Update::CONSTRUCTOR_IDS.contains(&id) {
        return Ok(None);
    }
    let raw = tl::enums::Update::from_bytes(bytes)?;
    Ok(Some(raw.into()))
}
