//! Bare constructors.
//!
//! Fields typed with a boxed schema type hold the matching [`crate::enums`]
//! value; `flags.N?true` fields become `bool`, other conditional fields
//! become `Option<T>`.

use crate::deserialize::{Buffer, Result};
use crate::{enums, Deserializable, Identifiable, Serializable};

// ─── Envelope ─────────────────────────────────────────────────────────────────

tl_struct! {
    /// `rpc_error#2144ca19`: the backend rejected a correlated request.
    RpcError = 0x2144ca19 { error_code: i32, error_message: String }
}

tl_struct! {
    /// `gzip_packed#3072cfa1`: compressed inner payload.
    GzipPacked = 0x3072cfa1 { packed_data: Vec<u8> }
}

tl_struct! { Ok = 0x79dcdd47 {} }

// ─── Authentication codes ─────────────────────────────────────────────────────

tl_struct! { AuthenticationCodeTypeSms = 0x2bbd2327 { length: i32 } }
tl_struct! { AuthenticationCodeTypeCall = 0x59b46402 { length: i32 } }
tl_struct! { AuthenticationCodeTypeFlashCall = 0x3c88e462 { pattern: String } }
tl_struct! {
    AuthenticationCodeTypeMissedCall = 0x1c4a551e { phone_number_prefix: String, length: i32 }
}
tl_struct! { AuthenticationCodeTypeFragment = 0x8c65d4e2 { url: String, length: i32 } }

/// `authenticationCodeInfo flags:# phone_number:string type:AuthenticationCodeType
/// next_type:flags.0?AuthenticationCodeType timeout:int`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuthenticationCodeInfo {
    pub phone_number: String,
    pub r#type:       enums::AuthenticationCodeType,
    pub next_type:    Option<enums::AuthenticationCodeType>,
    /// Seconds before the code may be resent.
    pub timeout:      i32,
}

impl Identifiable for AuthenticationCodeInfo {
    const CONSTRUCTOR_ID: u32 = 0x02e9ae48;
}

impl Serializable for AuthenticationCodeInfo {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        (if self.next_type.is_some() { 1u32 } else { 0 }).serialize(buf);
        self.phone_number.serialize(buf);
        self.r#type.serialize(buf);
        if let Some(ref v) = self.next_type { v.serialize(buf); }
        self.timeout.serialize(buf);
    }
}

impl Deserializable for AuthenticationCodeInfo {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let _flags = u32::deserialize(buf)?;
        let phone_number = String::deserialize(buf)?;
        let r#type = enums::AuthenticationCodeType::deserialize(buf)?;
        let next_type = if (_flags & (1 << 0)) != 0 {
            Some(enums::AuthenticationCodeType::deserialize(buf)?)
        } else {
            None
        };
        let timeout = i32::deserialize(buf)?;
        Result::Ok(Self { phone_number, r#type, next_type, timeout })
    }
}

// ─── Authorization states ─────────────────────────────────────────────────────

tl_struct! { AuthorizationStateWaitParameters = 0x00aec943 {} }
tl_struct! { AuthorizationStateWaitPhoneNumber = 0x5d887154 {} }
tl_struct! {
    AuthorizationStateWaitCode = 0x79d06caa { code_info: enums::AuthenticationCodeInfo }
}

/// `authorizationStateWaitPassword flags:# has_recovery_email_address:flags.0?true
/// password_hint:string`
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuthorizationStateWaitPassword {
    pub has_recovery_email_address: bool,
    pub password_hint:              String,
}

impl Identifiable for AuthorizationStateWaitPassword {
    const CONSTRUCTOR_ID: u32 = 0x344bf237;
}

impl Serializable for AuthorizationStateWaitPassword {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        (if self.has_recovery_email_address { 1u32 } else { 0 }).serialize(buf);
        self.password_hint.serialize(buf);
    }
}

impl Deserializable for AuthorizationStateWaitPassword {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let _flags = u32::deserialize(buf)?;
        let has_recovery_email_address = (_flags & (1 << 0)) != 0;
        let password_hint = String::deserialize(buf)?;
        Result::Ok(Self { has_recovery_email_address, password_hint })
    }
}

tl_struct! { AuthorizationStateWaitRegistration = 0xa97cc2d9 {} }
tl_struct! { AuthorizationStateReady = 0x4ed0a2c7 {} }
tl_struct! { AuthorizationStateLoggingOut = 0x3f0b9b5a {} }
tl_struct! { AuthorizationStateClosing = 0x5d6cd935 {} }
tl_struct! { AuthorizationStateClosed = 0x47c8e1a9 {} }

// ─── Connection states ────────────────────────────────────────────────────────

tl_struct! { ConnectionStateWaitingForNetwork = 0x09fc50b0 {} }
tl_struct! { ConnectionStateConnectingToProxy = 0xa4289818 {} }
tl_struct! { ConnectionStateConnecting = 0x9f061ad0 {} }
tl_struct! { ConnectionStateUpdating = 0x476c48bb {} }
tl_struct! { ConnectionStateReady = 0xd593ba9d {} }

// ─── Entities ─────────────────────────────────────────────────────────────────

/// `message flags:# is_outgoing:flags.0?true id:long chat_id:long sender_user_id:long
/// date:int edit_date:flags.1?int text:string`
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub is_outgoing:    bool,
    pub id:             i64,
    pub chat_id:        i64,
    pub sender_user_id: i64,
    /// Unix timestamp.
    pub date:           i32,
    pub edit_date:      Option<i32>,
    pub text:           String,
}

impl Identifiable for Message {
    const CONSTRUCTOR_ID: u32 = 0x38501549;
}

impl Serializable for Message {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        let flags: u32 = (if self.is_outgoing { 1 << 0 } else { 0 })
            | (if self.edit_date.is_some() { 1 << 1 } else { 0 });
        flags.serialize(buf);
        self.id.serialize(buf);
        self.chat_id.serialize(buf);
        self.sender_user_id.serialize(buf);
        self.date.serialize(buf);
        if let Some(ref v) = self.edit_date { v.serialize(buf); }
        self.text.serialize(buf);
    }
}

impl Deserializable for Message {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let _flags = u32::deserialize(buf)?;
        let is_outgoing = (_flags & (1 << 0)) != 0;
        let id = i64::deserialize(buf)?;
        let chat_id = i64::deserialize(buf)?;
        let sender_user_id = i64::deserialize(buf)?;
        let date = i32::deserialize(buf)?;
        let edit_date = if (_flags & (1 << 1)) != 0 { Some(i32::deserialize(buf)?) } else { None };
        let text = String::deserialize(buf)?;
        Result::Ok(Self { is_outgoing, id, chat_id, sender_user_id, date, edit_date, text })
    }
}

tl_struct! { Chat = 0x9d2db747 { id: i64, title: String, unread_count: i32 } }

tl_struct! {
    User = 0x287e4506 {
        id:           i64,
        first_name:   String,
        last_name:    String,
        username:     String,
        phone_number: String,
    }
}

tl_struct! { UserStatusEmpty = 0x8e95760c {} }
tl_struct! { UserStatusOnline = 0xacf15c0f { expires: i32 } }
tl_struct! { UserStatusOffline = 0x1f149529 { was_online: i32 } }
tl_struct! { UserStatusRecently = 0xecaf6388 {} }

tl_struct! {
    File = 0xe61e8d64 {
        id:                       i32,
        size:                     i64,
        downloaded_size:          i64,
        is_downloading_completed: bool,
    }
}

// ─── Calls ────────────────────────────────────────────────────────────────────

tl_struct! { CallStatePending = 0xbdedf714 {} }
tl_struct! { CallStateReady = 0x09b1cd48 {} }
tl_struct! { CallStateHangingUp = 0xcea15be8 {} }
tl_struct! { CallStateDiscarded = 0xa3edf1be { duration: i32 } }

tl_struct! {
    Call = 0xd452bbe1 { id: i32, user_id: i64, is_outgoing: bool, state: enums::CallState }
}

// ─── Updates ──────────────────────────────────────────────────────────────────

tl_struct! {
    UpdateAuthorizationState = 0x94dbb537 { authorization_state: enums::AuthorizationState }
}
tl_struct! { UpdateConnectionState = 0x02a68ad6 { state: enums::ConnectionState } }
tl_struct! { UpdateNewMessage = 0xf44fb569 { message: enums::Message } }
tl_struct! {
    UpdateMessageContent = 0xde2d3474 {
        chat_id:    i64,
        message_id: i64,
        text:       String,
        edit_date:  i32,
    }
}
tl_struct! {
    UpdateDeleteMessages = 0x8cd56286 {
        chat_id:      i64,
        message_ids:  Vec<i64>,
        is_permanent: bool,
    }
}
tl_struct! { UpdateNewChat = 0x606648d4 { chat: enums::Chat } }
tl_struct! { UpdateChatTitle = 0x49a4a1b4 { chat_id: i64, title: String } }

/// `updateChatLastMessage flags:# chat_id:long last_message:flags.0?Message`
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateChatLastMessage {
    pub chat_id:      i64,
    pub last_message: Option<enums::Message>,
}

impl Identifiable for UpdateChatLastMessage {
    const CONSTRUCTOR_ID: u32 = 0x2c55f954;
}

impl Serializable for UpdateChatLastMessage {
    fn serialize(&self, buf: &mut impl Extend<u8>) {
        (if self.last_message.is_some() { 1u32 } else { 0 }).serialize(buf);
        self.chat_id.serialize(buf);
        if let Some(ref v) = self.last_message { v.serialize(buf); }
    }
}

impl Deserializable for UpdateChatLastMessage {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let _flags = u32::deserialize(buf)?;
        let chat_id = i64::deserialize(buf)?;
        let last_message = if (_flags & (1 << 0)) != 0 {
            Some(enums::Message::deserialize(buf)?)
        } else {
            None
        };
        Result::Ok(Self { chat_id, last_message })
    }
}

tl_struct! {
    UpdateChatReadInbox = 0xb2c3ad07 {
        chat_id:                    i64,
        last_read_inbox_message_id: i64,
        unread_count:               i32,
    }
}
tl_struct! { UpdateUser = 0xec12a91c { user: enums::User } }
tl_struct! { UpdateUserStatus = 0x386fe33e { user_id: i64, status: enums::UserStatus } }
tl_struct! { UpdateFile = 0x908c5f70 { file: enums::File } }
tl_struct! { UpdateCall = 0xcb0dcae9 { call: enums::Call } }
