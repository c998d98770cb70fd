//! Error types for telecore-client.

use std::sync::Arc;
use std::{fmt, io};

// ─── RpcError ─────────────────────────────────────────────────────────────────

/// An error returned by the backend in response to an RPC call.
///
/// Numeric suffixes are stripped from the name and placed in [`RpcError::value`].
///
/// # Example
/// `FLOOD_WAIT_30` → `RpcError { code: 420, name: "FLOOD_WAIT", value: Some(30) }`
#[derive(Clone, Debug, PartialEq)]
pub struct RpcError {
    /// HTTP-like status code.
    pub code:  i32,
    /// Error name in SCREAMING_SNAKE_CASE with the numeric suffix removed.
    pub name:  String,
    /// Numeric suffix extracted from the name, if any.
    pub value: Option<u32>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC {}: {}", self.code, self.name)?;
        if let Some(v) = self.value {
            write!(f, " (value: {v})")?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

impl RpcError {
    /// Status code reserved for "the submitted credential was rejected".
    pub const CREDENTIAL_REJECTED: i32 = 400;

    /// Parse a raw error message like `"FLOOD_WAIT_30"`.
    pub fn from_wire(code: i32, message: &str) -> Self {
        if let Some((name, suffix)) = message.rsplit_once('_') {
            if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(v) = suffix.parse::<u32>() {
                    return Self { code, name: name.to_string(), value: Some(v) };
                }
            }
        }
        Self { code, name: message.to_string(), value: None }
    }

    /// Match on the error name, with optional wildcard prefix/suffix `'*'`.
    ///
    /// # Examples
    /// - `err.is("PHONE_CODE_INVALID")`: exact match
    /// - `err.is("PHONE_CODE_*")`: starts-with match
    /// - `err.is("*_INVALID")`: ends-with match
    pub fn is(&self, pattern: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix('*') {
            self.name.starts_with(prefix)
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            self.name.ends_with(suffix)
        } else {
            self.name == pattern
        }
    }

    /// `true` for code 400: the code or password itself was wrong.
    pub fn is_credential_rejection(&self) -> bool {
        self.code == Self::CREDENTIAL_REJECTED
    }
}

// ─── InvocationError ──────────────────────────────────────────────────────────

/// The error type returned from any call that goes through [`crate::RpcClient`].
#[derive(Debug)]
pub enum InvocationError {
    /// The backend rejected the request.
    Rpc(RpcError),
    /// Network / I/O failure while opening the connection.
    Io(io::Error),
    /// The response arrived but could not be decoded as the expected type.
    Deserialize(String),
    /// The connection went away while the request was outstanding.
    ConnectionClosed,
    /// The client has not been started, or has been stopped.
    NotRunning,
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc(e)          => write!(f, "{e}"),
            Self::Io(e)           => write!(f, "I/O error: {e}"),
            Self::Deserialize(s)  => write!(f, "deserialize error: {s}"),
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::NotRunning      => write!(f, "client is not running"),
        }
    }
}

impl std::error::Error for InvocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rpc(e) => Some(e),
            Self::Io(e)  => Some(e),
            _            => None,
        }
    }
}

impl From<io::Error> for InvocationError {
    fn from(e: io::Error) -> Self { Self::Io(e) }
}

impl From<telecore_tl::deserialize::Error> for InvocationError {
    fn from(e: telecore_tl::deserialize::Error) -> Self { Self::Deserialize(e.to_string()) }
}

impl InvocationError {
    /// Returns `true` if this is the named RPC error (supports `'*'` wildcards).
    pub fn is(&self, pattern: &str) -> bool {
        match self {
            Self::Rpc(e) => e.is(pattern),
            _            => false,
        }
    }

    /// `true` if the backend answered with code 400.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, Self::Rpc(e) if e.is_credential_rejection())
    }
}

// ─── AuthError ────────────────────────────────────────────────────────────────

/// Errors surfaced by [`crate::AuthStateMachine`] operations.
///
/// Cloneable so the last one can be published as an observable value.
#[derive(Clone, Debug)]
pub enum AuthError {
    /// The phone number failed local validation.
    InvalidPhoneNumber,
    /// The code failed local validation, or the backend rejected it.
    InvalidCode,
    /// The password was empty, or the backend rejected it.
    InvalidPassword,
    /// The operation does not apply to the current input or state.
    InvalidState,
    /// Another operation is still in flight.
    AlreadyProcessing,
    /// Any other backend or connection failure.
    Network(Arc<InvocationError>),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPhoneNumber => write!(f, "invalid phone number"),
            Self::InvalidCode        => write!(f, "invalid code"),
            Self::InvalidPassword    => write!(f, "invalid password"),
            Self::InvalidState       => write!(f, "operation not valid in the current state"),
            Self::AlreadyProcessing  => write!(f, "another operation is in progress"),
            Self::Network(e)         => write!(f, "network error: {e}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<InvocationError> for AuthError {
    fn from(e: InvocationError) -> Self { Self::Network(Arc::new(e)) }
}
