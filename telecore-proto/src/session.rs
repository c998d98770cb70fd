//! Per-connection request state.

use telecore_tl::RemoteCall;

use crate::message::{Message, Token};

/// Hands out correlation tokens for one connection.
///
/// Tokens start at 1 and only ever grow, so no two requests sent over the
/// same session share one. A `Session` is cheap to create and is replaced
/// on reconnect.
///
/// # Example
///
/// ```rust
/// use telecore_proto::Session;
/// use telecore_tl::functions;
///
/// let mut session = Session::new();
/// let msg = session.pack(&functions::GetMe {});
/// assert_eq!(msg.token.0, 1);
/// ```
#[derive(Debug)]
pub struct Session {
    last_token: i64,
}

impl Session {
    /// Create a fresh session.
    pub fn new() -> Self {
        Self { last_token: 0 }
    }

    /// Allocate the next correlation token.
    pub fn next_token(&mut self) -> Token {
        self.last_token = self.last_token.wrapping_add(1);
        Token(self.last_token)
    }

    /// Serialize an RPC function into a [`Message`] carrying a fresh token.
    pub fn pack<R: RemoteCall>(&mut self, call: &R) -> Message {
        let token = self.next_token();
        Message::new(token, call.to_bytes())
    }
}

impl Default for Session {
    fn default() -> Self { Self::new() }
}
