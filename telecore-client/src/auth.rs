//! Login state machine.
//!
//! [`AuthStateMachine`] is the only thing that changes the observed
//! [`AuthorizationState`]. It takes input from two sides:
//!
//! * the direct results of its own operations, and
//! * `updateAuthorizationState` pushes, delivered to it as the
//!   authorization delegate of the [`Dispatcher`](crate::Dispatcher).
//!
//! Both carry the receive `seq` the RPC client stamped on them, and a state
//! is applied only if it is newer than the last one applied. Whichever path
//! delivers a transition first wins; the other is a no-op.
//!
//! Operations are single-flight: while one is running every other fails
//! with [`AuthError::AlreadyProcessing`] before touching anything.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use telecore_tl as tl;
use telecore_tl::functions;
use tokio::sync::watch;

use crate::dispatcher::{AuthUpdate, Delegate};
use crate::errors::AuthError;
use crate::rpc::RpcClient;
use crate::update::ConnectionState;

// ─── CodeInfo ─────────────────────────────────────────────────────────────────

/// How a login code is delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodeType {
    Sms { length: i32 },
    Call { length: i32 },
    FlashCall { pattern: String },
    MissedCall { phone_number_prefix: String, length: i32 },
    Fragment { url: String, length: i32 },
}

impl From<tl::enums::AuthenticationCodeType> for CodeType {
    fn from(t: tl::enums::AuthenticationCodeType) -> Self {
        use tl::enums::AuthenticationCodeType as T;
        match t {
            T::Sms(t)        => Self::Sms { length: t.length },
            T::Call(t)       => Self::Call { length: t.length },
            T::FlashCall(t)  => Self::FlashCall { pattern: t.pattern },
            T::MissedCall(t) => Self::MissedCall { phone_number_prefix: t.phone_number_prefix, length: t.length },
            T::Fragment(t)   => Self::Fragment { url: t.url, length: t.length },
        }
    }
}

/// Where a login code went and what to do if it does not arrive.
///
/// Immutable: a new code (after a resend) comes as a whole new `CodeInfo`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodeInfo {
    phone_number: String,
    code_type:    CodeType,
    next_type:    Option<CodeType>,
    timeout:      i32,
}

impl CodeInfo {
    pub fn phone_number(&self) -> &str { &self.phone_number }

    /// The channel the current code was sent through.
    pub fn code_type(&self) -> &CodeType { &self.code_type }

    /// The channel a resend would use, if any.
    pub fn next_type(&self) -> Option<&CodeType> { self.next_type.as_ref() }

    /// Seconds before a resend is allowed.
    pub fn timeout(&self) -> i32 { self.timeout }
}

impl From<tl::enums::AuthenticationCodeInfo> for CodeInfo {
    fn from(info: tl::enums::AuthenticationCodeInfo) -> Self {
        let tl::enums::AuthenticationCodeInfo::Info(info) = info;
        Self {
            phone_number: info.phone_number,
            code_type:    info.r#type.into(),
            next_type:    info.next_type.map(Into::into),
            timeout:      info.timeout,
        }
    }
}

// ─── AuthorizationState ───────────────────────────────────────────────────────

/// Where the login flow currently is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthorizationState {
    /// Nothing is known yet, or the backend is busy.
    #[default]
    Loading,
    WaitingForPhoneNumber,
    WaitingForCode(CodeInfo),
    WaitingForPassword { hint: String, has_recovery_email: bool },
    WaitingForRegistration,
    Authorized,
}

impl AuthorizationState {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Loading                   => "Loading",
            Self::WaitingForPhoneNumber     => "WaitingForPhoneNumber",
            Self::WaitingForCode(_)         => "WaitingForCode",
            Self::WaitingForPassword { .. } => "WaitingForPassword",
            Self::WaitingForRegistration    => "WaitingForRegistration",
            Self::Authorized                => "Authorized",
        }
    }
}

/// Transitional backend states (parameters, logging out, closing) show as
/// `Loading`; a closed session needs a phone number again.
impl From<tl::enums::AuthorizationState> for AuthorizationState {
    fn from(state: tl::enums::AuthorizationState) -> Self {
        use tl::enums::AuthorizationState as S;
        match state {
            S::WaitParameters(_) | S::LoggingOut(_) | S::Closing(_) => Self::Loading,
            S::WaitPhoneNumber(_) | S::Closed(_)                    => Self::WaitingForPhoneNumber,
            S::WaitCode(s)         => Self::WaitingForCode(s.code_info.into()),
            S::WaitPassword(s)     => Self::WaitingForPassword {
                hint:               s.password_hint,
                has_recovery_email: s.has_recovery_email_address,
            },
            S::WaitRegistration(_) => Self::WaitingForRegistration,
            S::Ready(_)            => Self::Authorized,
        }
    }
}

// ─── Validation ───────────────────────────────────────────────────────────────

/// Keep only digits and `+`; accept the result if it starts with `+` and is
/// 7 to 15 characters long.
pub fn normalize_phone_number(input: &str) -> Option<String> {
    let phone: String = input.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect();
    (phone.starts_with('+') && (7..=15).contains(&phone.len())).then_some(phone)
}

/// 4 to 8 ASCII digits.
pub fn is_valid_code(code: &str) -> bool {
    (4..=8).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit())
}

// ─── AuthStateMachine ─────────────────────────────────────────────────────────

struct Inner {
    rpc:         RpcClient,
    state:       watch::Sender<AuthorizationState>,
    processing:  watch::Sender<bool>,
    last_error:  watch::Sender<Option<AuthError>>,
    connection:  watch::Sender<ConnectionState>,
    busy:        AtomicBool,
    /// `seq` of the last applied state.
    applied_seq: Mutex<u64>,
}

/// Drives the login flow. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AuthStateMachine {
    inner: Arc<Inner>,
}

/// Holds the single-flight slot; releasing it clears `is_processing`.
struct ProcessingGuard<'a> {
    inner: &'a Inner,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.inner.busy.store(false, Ordering::Release);
        self.inner.processing.send_replace(false);
    }
}

impl AuthStateMachine {
    pub fn new(rpc: RpcClient) -> Self {
        Self {
            inner: Arc::new(Inner {
                rpc,
                state:       watch::channel(AuthorizationState::Loading).0,
                processing:  watch::channel(false).0,
                last_error:  watch::channel(None).0,
                connection:  watch::channel(ConnectionState::default()).0,
                busy:        AtomicBool::new(false),
                applied_seq: Mutex::new(0),
            }),
        }
    }

    // ── Observables ────────────────────────────────────────────────────────

    pub fn state(&self) -> AuthorizationState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthorizationState> {
        self.inner.state.subscribe()
    }

    pub fn is_processing(&self) -> bool {
        *self.inner.processing.borrow()
    }

    pub fn subscribe_processing(&self) -> watch::Receiver<bool> {
        self.inner.processing.subscribe()
    }

    /// The error of the most recent operation, if it failed.
    pub fn last_error(&self) -> Option<AuthError> {
        self.inner.last_error.borrow().clone()
    }

    pub fn clear_error(&self) {
        self.inner.last_error.send_replace(None);
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<AuthError>> {
        self.inner.last_error.subscribe()
    }

    /// The backend's connection state as last pushed.
    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.connection.borrow()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.subscribe()
    }

    // ── Operations ─────────────────────────────────────────────────────────

    /// Submit the account's phone number.
    ///
    /// Leads to [`AuthorizationState::WaitingForCode`].
    pub async fn send_phone_number(&self, number: &str) -> Result<(), AuthError> {
        self.guarded("send_phone_number", move || async move {
            let phone_number = normalize_phone_number(number).ok_or(AuthError::InvalidPhoneNumber)?;
            let info = self
                .inner
                .rpc
                .invoke_sequenced(&functions::SetAuthenticationPhoneNumber { phone_number })
                .await?;
            self.apply(info.seq, AuthorizationState::WaitingForCode(info.value.into()));
            Ok(())
        })
        .await
    }

    /// Submit the login code.
    ///
    /// A rejected code fails with [`AuthError::InvalidCode`] and leaves the
    /// state alone so the user can try again.
    pub async fn verify_code(&self, code: &str) -> Result<(), AuthError> {
        self.guarded("verify_code", move || async move {
            if !is_valid_code(code) {
                return Err(AuthError::InvalidCode);
            }
            let req = functions::CheckAuthenticationCode { code: code.to_string() };
            match self.inner.rpc.invoke_sequenced(&req).await {
                Ok(s) => {
                    self.apply(s.seq, s.value.into());
                    Ok(())
                }
                Err(e) if e.is_credential_rejection() => Err(AuthError::InvalidCode),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Submit the two-step verification password.
    pub async fn verify_password(&self, password: &str) -> Result<(), AuthError> {
        self.guarded("verify_password", move || async move {
            if password.is_empty() {
                return Err(AuthError::InvalidPassword);
            }
            let req = functions::CheckAuthenticationPassword { password: password.to_string() };
            match self.inner.rpc.invoke_sequenced(&req).await {
                Ok(s) => {
                    self.apply(s.seq, s.value.into());
                    Ok(())
                }
                Err(e) if e.is_credential_rejection() => Err(AuthError::InvalidPassword),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Create the account for a phone number the backend does not know.
    pub async fn register_user(&self, first_name: &str, last_name: Option<&str>) -> Result<(), AuthError> {
        self.guarded("register_user", move || async move {
            if first_name.trim().is_empty() {
                return Err(AuthError::InvalidState);
            }
            let req = functions::RegisterUser {
                first_name: first_name.trim().to_string(),
                last_name:  last_name.unwrap_or_default().trim().to_string(),
            };
            let s = self.inner.rpc.invoke_sequenced(&req).await?;
            self.apply(s.seq, s.value.into());
            Ok(())
        })
        .await
    }

    /// Ask for the code again. The new code info arrives as a push.
    pub async fn resend_code(&self) -> Result<(), AuthError> {
        self.guarded("resend_code", move || async move {
            if !matches!(self.state(), AuthorizationState::WaitingForCode(_)) {
                return Err(AuthError::InvalidState);
            }
            self.inner.rpc.invoke(&functions::ResendAuthenticationCode {}).await?;
            Ok(())
        })
        .await
    }

    /// Log out and go back to [`AuthorizationState::WaitingForPhoneNumber`],
    /// whether or not the backend call succeeded.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.guarded("logout", move || async move {
            let result = self.inner.rpc.invoke(&functions::LogOut {}).await;
            self.reset(AuthorizationState::WaitingForPhoneNumber);
            result.map(drop).map_err(AuthError::from)
        })
        .await
    }

    /// Fetch the current state from the backend and apply it.
    ///
    /// Not gated by [`is_processing`](Self::is_processing).
    pub async fn refresh(&self) -> Result<AuthorizationState, AuthError> {
        let s = self.inner.rpc.invoke_sequenced(&functions::GetAuthorizationState {}).await?;
        self.apply(s.seq, s.value.into());
        Ok(self.state())
    }

    // ── Internals ──────────────────────────────────────────────────────────

    fn begin(&self) -> Result<ProcessingGuard<'_>, AuthError> {
        self.inner
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| AuthError::AlreadyProcessing)?;
        self.inner.processing.send_replace(true);
        Ok(ProcessingGuard { inner: &self.inner })
    }

    async fn guarded<F, Fut>(&self, op: &'static str, f: F) -> Result<(), AuthError>
    where
        F:   FnOnce() -> Fut,
        Fut: Future<Output = Result<(), AuthError>>,
    {
        let _guard = self.begin()?;
        self.inner.last_error.send_replace(None);
        tracing::debug!("[telecore] {op} …");

        let result = f().await;
        if let Err(e) = &result {
            tracing::warn!("[telecore] {op} failed: {e}");
            self.inner.last_error.send_replace(Some(e.clone()));
        }
        result
    }

    /// Apply `state` if `seq` is newer than what was applied last.
    fn apply(&self, seq: u64, state: AuthorizationState) -> bool {
        let mut applied = self.inner.applied_seq.lock().unwrap_or_else(PoisonError::into_inner);
        if seq <= *applied {
            tracing::debug!(seq, applied = *applied, "[telecore] Ignoring stale {}", state.name());
            return false;
        }
        *applied = seq;
        self.publish(state);
        true
    }

    /// Replace the state regardless of order; everything received so far
    /// becomes stale.
    fn reset(&self, state: AuthorizationState) {
        let mut applied = self.inner.applied_seq.lock().unwrap_or_else(PoisonError::into_inner);
        *applied = (*applied).max(self.inner.rpc.last_seq());
        self.publish(state);
    }

    fn publish(&self, state: AuthorizationState) {
        let name = state.name();
        let changed = self.inner.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            tracing::info!("[telecore] Authorization state: {name}");
        }
    }
}

#[async_trait]
impl Delegate<AuthUpdate> for AuthStateMachine {
    async fn handle(&self, event: AuthUpdate) {
        match event {
            AuthUpdate::AuthorizationState { seq, state } => {
                self.apply(seq, state);
            }
            AuthUpdate::ConnectionState { state, .. } => {
                tracing::debug!("[telecore] Connection state: {state:?}");
                self.inner.connection.send_replace(state);
            }
        }
    }
}
