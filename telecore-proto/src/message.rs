//! Outbound request framing.

use telecore_tl::deserialize::{self, Cursor};
use telecore_tl::functions::InvokeWithToken;
use telecore_tl::{Deserializable, Identifiable, Serializable};

/// A 64-bit correlation token, echoed back by the backend in `rpc_result`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Token(pub i64);

/// A request ready to be handed to a backend.
#[derive(Debug)]
pub struct Message {
    /// Token the response will carry.
    pub token: Token,
    /// The serialized function (constructor ID + fields).
    pub body: Vec<u8>,
}

impl Message {
    /// Pair a serialized call with its token.
    pub fn new(token: Token, body: Vec<u8>) -> Self {
        Self { token, body }
    }

    /// Serialize into the wire form:
    ///
    /// ```text
    /// invokeWithToken#5ca3ee13
    /// token:long
    /// query:!X      (the raw body)
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 8 + self.body.len());
        InvokeWithToken::<()>::CONSTRUCTOR_ID.serialize(&mut buf);
        self.token.0.serialize(&mut buf);
        buf.extend_from_slice(&self.body);
        buf
    }

    /// Parse the wire form back into token + body. Used by backends that
    /// answer requests in-process.
    pub fn from_bytes(bytes: &[u8]) -> deserialize::Result<Self> {
        let mut cur = Cursor::from_slice(bytes);
        let id = u32::deserialize(&mut cur)?;
        if id != InvokeWithToken::<()>::CONSTRUCTOR_ID {
            return Err(deserialize::Error::UnexpectedConstructor { id });
        }
        let token = i64::deserialize(&mut cur)?;
        let mut body = Vec::new();
        cur.read_to_end(&mut body);
        Ok(Self { token: Token(token), body })
    }
}
