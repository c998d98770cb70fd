//! In-memory simulated backend.
//!
//! Plays the server side of the login protocol without any network: any
//! well-formed phone number is accepted, the code is fixed by
//! [`FakeConfig::code`], and an optional password and registration step can
//! be switched on. Like the real service it pushes
//! `updateAuthorizationState` before answering a request that changed the
//! state, so both transition paths of the client get exercised.
//!
//! Account state is shared by every connection the backend opens, so a
//! reconnect finds the session where it was left.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use telecore_proto::{envelope, Message};
use telecore_tl::deserialize::{self, Cursor};
use telecore_tl::{enums, functions, types, Deserializable, Identifiable, Serializable};

use super::{Backend, Link};

const GET_AUTHORIZATION_STATE: u32 = functions::GetAuthorizationState::CONSTRUCTOR_ID;
const SET_PHONE_NUMBER:        u32 = functions::SetAuthenticationPhoneNumber::CONSTRUCTOR_ID;
const RESEND_CODE:             u32 = functions::ResendAuthenticationCode::CONSTRUCTOR_ID;
const CHECK_CODE:              u32 = functions::CheckAuthenticationCode::CONSTRUCTOR_ID;
const CHECK_PASSWORD:          u32 = functions::CheckAuthenticationPassword::CONSTRUCTOR_ID;
const REGISTER_USER:           u32 = functions::RegisterUser::CONSTRUCTOR_ID;
const LOG_OUT:                 u32 = functions::LogOut::CONSTRUCTOR_ID;
const GET_ME:                  u32 = functions::GetMe::CONSTRUCTOR_ID;

/// Id of the account the fake backend logs in.
pub const FAKE_USER_ID: i64 = 1_000_001;
/// Id of the chat it greets the account in.
pub const FAKE_CHAT_ID: i64 = 42;

// ─── Config ───────────────────────────────────────────────────────────────────

/// Behaviour of the simulated backend.
#[derive(Clone, Debug)]
pub struct FakeConfig {
    /// The only code `checkAuthenticationCode` accepts.
    pub code:                  String,
    /// When set, a correct code leads to the password step.
    pub password:              Option<String>,
    /// Hint reported while waiting for the password.
    pub password_hint:         String,
    /// When set, the account must register before it is authorized.
    pub registration_required: bool,
    /// Delay before each request is answered.
    pub latency:               Duration,
    /// Resend timeout reported with each code, in seconds.
    pub code_timeout:          i32,
    /// Push `updateAuthorizationState` before state-changing responses.
    pub push_auth_updates:     bool,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            code:                  "12345".into(),
            password:              None,
            password_hint:         String::new(),
            registration_required: false,
            latency:               Duration::ZERO,
            code_timeout:          60,
            push_auth_updates:     true,
        }
    }
}

// ─── FakeBackend ──────────────────────────────────────────────────────────────

pub struct FakeBackend {
    config:  Arc<FakeConfig>,
    account: Arc<Mutex<Account>>,
}

impl FakeBackend {
    pub fn new(config: FakeConfig) -> Self {
        Self { config: Arc::new(config), account: Arc::new(Mutex::new(Account::default())) }
    }
}

impl Default for FakeBackend {
    fn default() -> Self { Self::new(FakeConfig::default()) }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn open(&self) -> io::Result<Link> {
        let (client, server) = Link::pair();
        let server = FakeServer {
            config:  Arc::clone(&self.config),
            account: Arc::clone(&self.account),
            link:    server,
        };
        tokio::spawn(server.run());
        Ok(client)
    }

    fn name(&self) -> &str { "fake" }
}

// ─── Account ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq)]
enum Stage {
    #[default]
    WaitPhone,
    WaitCode { via_call: bool },
    WaitPassword,
    WaitRegistration,
    Ready,
}

#[derive(Debug, Default)]
struct Account {
    stage:      Stage,
    phone:      String,
    first_name: String,
    last_name:  String,
}

/// What one request produces: pushes first, then the response.
struct Reply {
    pushes:   Vec<Vec<u8>>,
    response: Result<Vec<u8>, (i32, &'static str)>,
}

impl Reply {
    fn ok<T: Serializable>(value: T) -> Self {
        Self { pushes: Vec::new(), response: Ok(value.to_bytes()) }
    }

    fn err(code: i32, message: &'static str) -> Self {
        Self { pushes: Vec::new(), response: Err((code, message)) }
    }
}

// ─── Server ───────────────────────────────────────────────────────────────────

struct FakeServer {
    config:  Arc<FakeConfig>,
    account: Arc<Mutex<Account>>,
    link:    Link,
}

impl FakeServer {
    async fn run(mut self) {
        self.send(connection_update(types::ConnectionStateConnecting {}.into()));
        self.send(connection_update(types::ConnectionStateReady {}.into()));
        let current = self.with_account(|config, acct| acct.wire_state(config));
        self.send(auth_update(current));

        while let Some(raw) = self.link.inbound.recv().await {
            if !self.config.latency.is_zero() {
                tokio::time::sleep(self.config.latency).await;
            }
            let msg = match Message::from_bytes(&raw) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("[fake] Ignoring non-request payload: {e}");
                    continue;
                }
            };

            let reply = self
                .with_account(|config, acct| acct.handle(config, &msg.body))
                .unwrap_or_else(|e| {
                    tracing::debug!("[fake] Undecodable request body: {e}");
                    Reply::err(400, "INPUT_REQUEST_INVALID")
                });

            for push in reply.pushes {
                self.send(push);
            }
            let response = match reply.response {
                Ok(body) => envelope::encode_result(msg.token, &body),
                Err((code, message)) => envelope::encode_error(msg.token, code, message),
            };
            if self.link.outbound.send(response).is_err() {
                break;
            }
        }
        tracing::debug!("[fake] Client hung up");
    }

    fn with_account<T>(&self, f: impl FnOnce(&FakeConfig, &mut Account) -> T) -> T {
        let mut acct = self.account.lock().unwrap_or_else(PoisonError::into_inner);
        f(&self.config, &mut acct)
    }

    fn send(&self, payload: Vec<u8>) {
        let _ = self.link.outbound.send(payload);
    }
}

impl Account {
    fn handle(&mut self, config: &FakeConfig, body: &[u8]) -> deserialize::Result<Reply> {
        let mut cur = Cursor::from_slice(body);
        let id = u32::deserialize(&mut cur)?;
        let before = self.stage.clone();

        let mut reply = match id {
            GET_AUTHORIZATION_STATE => Reply::ok(self.wire_state(config)),

            SET_PHONE_NUMBER => {
                let req = functions::SetAuthenticationPhoneNumber::deserialize(&mut cur)?;
                if !matches!(self.stage, Stage::WaitPhone | Stage::WaitCode { .. }) {
                    return Ok(Reply::err(406, "AUTH_STATE_UNEXPECTED"));
                }
                if !req.phone_number.starts_with('+') {
                    return Ok(Reply::err(400, "PHONE_NUMBER_INVALID"));
                }
                self.phone = req.phone_number;
                self.stage = Stage::WaitCode { via_call: false };
                Reply::ok(self.code_info(config))
            }

            RESEND_CODE => {
                if !matches!(self.stage, Stage::WaitCode { .. }) {
                    return Ok(Reply::err(406, "AUTH_STATE_UNEXPECTED"));
                }
                self.stage = Stage::WaitCode { via_call: true };
                Reply::ok(enums::Ok::from(types::Ok {}))
            }

            CHECK_CODE => {
                let req = functions::CheckAuthenticationCode::deserialize(&mut cur)?;
                if !matches!(self.stage, Stage::WaitCode { .. }) {
                    return Ok(Reply::err(406, "AUTH_STATE_UNEXPECTED"));
                }
                if req.code != config.code {
                    return Ok(Reply::err(400, "PHONE_CODE_INVALID"));
                }
                self.stage = if config.password.is_some() {
                    Stage::WaitPassword
                } else if config.registration_required {
                    Stage::WaitRegistration
                } else {
                    Stage::Ready
                };
                Reply::ok(self.wire_state(config))
            }

            CHECK_PASSWORD => {
                let req = functions::CheckAuthenticationPassword::deserialize(&mut cur)?;
                if self.stage != Stage::WaitPassword {
                    return Ok(Reply::err(406, "AUTH_STATE_UNEXPECTED"));
                }
                if config.password.as_deref() != Some(req.password.as_str()) {
                    return Ok(Reply::err(400, "PASSWORD_HASH_INVALID"));
                }
                self.stage = if config.registration_required { Stage::WaitRegistration } else { Stage::Ready };
                Reply::ok(self.wire_state(config))
            }

            REGISTER_USER => {
                let req = functions::RegisterUser::deserialize(&mut cur)?;
                if self.stage != Stage::WaitRegistration {
                    return Ok(Reply::err(406, "AUTH_STATE_UNEXPECTED"));
                }
                if req.first_name.trim().is_empty() {
                    return Ok(Reply::err(400, "FIRSTNAME_INVALID"));
                }
                self.first_name = req.first_name;
                self.last_name = req.last_name;
                self.stage = Stage::Ready;
                Reply::ok(self.wire_state(config))
            }

            LOG_OUT => {
                self.stage = Stage::WaitPhone;
                let mut reply = Reply::ok(enums::Ok::from(types::Ok {}));
                if config.push_auth_updates {
                    reply.pushes.push(auth_update(types::AuthorizationStateLoggingOut {}.into()));
                }
                reply
            }

            GET_ME => match self.stage {
                Stage::Ready => Reply::ok(enums::User::from(self.me())),
                _ => Reply::err(401, "AUTH_KEY_UNREGISTERED"),
            },

            _ => Reply::err(400, "INPUT_METHOD_INVALID"),
        };

        // logOut always announces the reset, even from the phone number stage.
        if self.stage != before || id == LOG_OUT {
            if config.push_auth_updates {
                reply.pushes.push(auth_update(self.wire_state(config)));
            }
            if self.stage == Stage::Ready {
                reply.pushes.extend(self.welcome());
            }
        }
        Ok(reply)
    }

    fn code_info(&self, config: &FakeConfig) -> enums::AuthenticationCodeInfo {
        let length = config.code.len() as i32;
        let via_call = matches!(self.stage, Stage::WaitCode { via_call: true });
        let (r#type, next_type): (enums::AuthenticationCodeType, Option<enums::AuthenticationCodeType>) = if via_call {
            (types::AuthenticationCodeTypeCall { length }.into(), None)
        } else {
            (
                types::AuthenticationCodeTypeSms { length }.into(),
                Some(types::AuthenticationCodeTypeCall { length }.into()),
            )
        };
        types::AuthenticationCodeInfo {
            phone_number: self.phone.clone(),
            r#type,
            next_type,
            timeout: config.code_timeout,
        }
        .into()
    }

    fn wire_state(&self, config: &FakeConfig) -> enums::AuthorizationState {
        match self.stage {
            Stage::WaitPhone => types::AuthorizationStateWaitPhoneNumber {}.into(),
            Stage::WaitCode { .. } => {
                types::AuthorizationStateWaitCode { code_info: self.code_info(config) }.into()
            }
            Stage::WaitPassword => types::AuthorizationStateWaitPassword {
                has_recovery_email_address: false,
                password_hint:              config.password_hint.clone(),
            }
            .into(),
            Stage::WaitRegistration => types::AuthorizationStateWaitRegistration {}.into(),
            Stage::Ready => types::AuthorizationStateReady {}.into(),
        }
    }

    fn me(&self) -> types::User {
        let first_name = if self.first_name.is_empty() { "Fake".to_string() } else { self.first_name.clone() };
        types::User {
            id:           FAKE_USER_ID,
            first_name,
            last_name:    self.last_name.clone(),
            username:     "fake_user".into(),
            phone_number: self.phone.clone(),
        }
    }

    /// What a fresh session sees right after login.
    fn welcome(&self) -> Vec<Vec<u8>> {
        let now = chrono::Utc::now().timestamp() as i32;
        let message = types::Message {
            is_outgoing:    false,
            id:             1,
            chat_id:        FAKE_CHAT_ID,
            sender_user_id: 777_000,
            date:           now,
            edit_date:      None,
            text:           "Welcome! This session is served by the in-memory backend.".into(),
        };
        vec![
            enums::Update::from(types::UpdateUser { user: self.me().into() }).to_bytes(),
            enums::Update::from(types::UpdateNewChat {
                chat: types::Chat { id: FAKE_CHAT_ID, title: "Service".into(), unread_count: 0 }.into(),
            })
            .to_bytes(),
            enums::Update::from(types::UpdateNewMessage { message: message.into() }).to_bytes(),
            enums::Update::from(types::UpdateChatReadInbox {
                chat_id:                    FAKE_CHAT_ID,
                last_read_inbox_message_id: 0,
                unread_count:               1,
            })
            .to_bytes(),
        ]
    }
}

fn auth_update(state: enums::AuthorizationState) -> Vec<u8> {
    enums::Update::from(types::UpdateAuthorizationState { authorization_state: state }).to_bytes()
}

fn connection_update(state: enums::ConnectionState) -> Vec<u8> {
    enums::Update::from(types::UpdateConnectionState { state }).to_bytes()
}
