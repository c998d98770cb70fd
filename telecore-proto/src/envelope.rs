//! Inbound payload classification.
//!
//! Every payload a backend sends is one of:
//!
//! | Constructor                  | Meaning                                    |
//! |------------------------------|--------------------------------------------|
//! | `rpc_result#f35c6d01`        | response to the request holding `req_token` |
//! | `msg_container#73f1f8dc`     | several payloads, routed in order          |
//! | `gzip_packed#3072cfa1`       | compressed payload, routed after inflating |
//! | anything else                | unsolicited push                           |
//!
//! The `encode_*` helpers build the same shapes for in-process backends and
//! tests.

use std::fmt;
use std::io::{self, Read, Write};

use telecore_tl::deserialize::{self, Cursor};
use telecore_tl::{types, Deserializable, Serializable};

use crate::message::Token;
use crate::transport::MAX_FRAME_LEN;

// ─── Constructor IDs ──────────────────────────────────────────────────────────

/// `rpc_result req_token:long result:Object`
pub const ID_RPC_RESULT:    u32 = 0xf35c6d01;
/// `rpc_error error_code:int error_message:string`
pub const ID_RPC_ERROR:     u32 = 0x2144ca19;
/// `msg_container payloads:vector<%RawPayload>`
pub const ID_MSG_CONTAINER: u32 = 0x73f1f8dc;
/// `gzip_packed packed_data:bytes`
pub const ID_GZIP_PACKED:   u32 = 0x3072cfa1;

/// Containers and gzip bodies may nest, but not without bound.
const MAX_DEPTH: usize = 4;

// ─── Types ────────────────────────────────────────────────────────────────────

/// An API error carried inside `rpc_result`.
#[derive(Clone, Debug, PartialEq)]
pub struct RpcFailure {
    /// Numeric status code; `400` means the submitted credential was rejected.
    pub code:    i32,
    /// Error name such as `PHONE_CODE_INVALID`.
    pub message: String,
}

/// One routed unit of an inbound payload.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    /// Response correlated with an earlier request.
    Result {
        /// The token the request was sent with.
        token: Token,
        /// Raw result bytes, or the API error the backend answered with.
        body:  Result<Vec<u8>, RpcFailure>,
    },
    /// Response to `token` whose body could not be decoded or inflated.
    Undecodable {
        token:  Token,
        reason: String,
    },
    /// Anything that is not a response: an update pushed by the backend.
    Push(Vec<u8>),
}

/// The payload could not be taken apart at all.
#[derive(Debug)]
pub enum Error {
    /// Fewer than four bytes: not even a constructor id.
    TooShort {
        /// Payload length.
        len: usize,
    },
    /// An envelope header was truncated or inconsistent.
    Malformed(deserialize::Error),
    /// `gzip_packed` held data that neither gzip nor zlib could inflate.
    Inflate(io::Error),
    /// Containers or gzip bodies nested deeper than allowed.
    TooDeep,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => write!(f, "payload too short ({len} bytes)"),
            Self::Malformed(e)     => write!(f, "malformed envelope: {e}"),
            Self::Inflate(e)       => write!(f, "gzip_packed inflate failed: {e}"),
            Self::TooDeep          => write!(f, "envelope nesting exceeds {MAX_DEPTH}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<deserialize::Error> for Error {
    fn from(e: deserialize::Error) -> Self { Self::Malformed(e) }
}

// ─── Decoding ─────────────────────────────────────────────────────────────────

/// Split an inbound payload into the results and pushes it carries, in order.
pub fn unwrap_envelope(payload: Vec<u8>) -> Result<Vec<Inbound>, Error> {
    let mut out = Vec::new();
    unwrap_into(payload, 0, &mut out)?;
    Ok(out)
}

fn unwrap_into(payload: Vec<u8>, depth: usize, out: &mut Vec<Inbound>) -> Result<(), Error> {
    if depth > MAX_DEPTH {
        return Err(Error::TooDeep);
    }
    let Some(head) = payload.first_chunk::<4>() else {
        return Err(Error::TooShort { len: payload.len() });
    };

    match u32::from_le_bytes(*head) {
        ID_RPC_RESULT => {
            let mut cur = Cursor::from_slice(&payload[4..]);
            let token = Token(i64::deserialize(&mut cur)?);
            let mut result = Vec::new();
            cur.read_to_end(&mut result);
            // From here on a failure belongs to this token's caller alone.
            out.push(match result_body(result, depth) {
                Ok(body) => Inbound::Result { token, body },
                Err(e) => Inbound::Undecodable { token, reason: e.to_string() },
            });
        }
        ID_MSG_CONTAINER => {
            let mut cur = Cursor::from_slice(&payload[4..]);
            let count = i32::deserialize(&mut cur)?;
            let before = out.len();
            for i in 0..count {
                let inner = match next_inner(&mut cur) {
                    Ok(inner) => inner,
                    // Broken framing: nothing after this point can be located.
                    Err(e) if out.len() == before => return Err(e),
                    Err(e) => {
                        log::warn!("[telecore] msg_container cut short at item {i}: {e}");
                        return Ok(());
                    }
                };
                let mut items = Vec::new();
                match unwrap_into(inner, depth + 1, &mut items) {
                    Ok(()) => out.extend(items),
                    Err(e) => log::warn!("[telecore] Skipping msg_container item {i}: {e}"),
                }
            }
            if cur.remaining() != 0 {
                log::debug!("[telecore] {} trailing bytes after msg_container", cur.remaining());
            }
        }
        ID_GZIP_PACKED => {
            let packed = types::GzipPacked::from_bytes(&payload[4..])?;
            unwrap_into(inflate(&packed.packed_data)?, depth + 1, out)?;
        }
        _ => out.push(Inbound::Push(payload)),
    }
    Ok(())
}

/// One length-prefixed payload of a `msg_container`.
fn next_inner(cur: &mut Cursor<'_>) -> Result<Vec<u8>, Error> {
    let len = i32::deserialize(cur)?;
    let len = usize::try_from(len).map_err(|_| deserialize::Error::UnexpectedEof)?;
    Ok(cur.take(len)?.to_vec())
}

/// The `result:Object` part of `rpc_result`: an error, a compressed body, or
/// the plain return value.
fn result_body(result: Vec<u8>, depth: usize) -> Result<Result<Vec<u8>, RpcFailure>, Error> {
    if depth > MAX_DEPTH {
        return Err(Error::TooDeep);
    }
    match result.first_chunk::<4>().map(|h| u32::from_le_bytes(*h)) {
        Some(ID_RPC_ERROR) => {
            let err = types::RpcError::from_bytes(&result[4..])?;
            Ok(Err(RpcFailure { code: err.error_code, message: err.error_message }))
        }
        Some(ID_GZIP_PACKED) => {
            let packed = types::GzipPacked::from_bytes(&result[4..])?;
            result_body(inflate(&packed.packed_data)?, depth + 1)
        }
        _ => Ok(Ok(result)),
    }
}

/// Inflate gzip or zlib data, refusing output larger than a frame.
fn inflate(data: &[u8]) -> Result<Vec<u8>, Error> {
    let limit = MAX_FRAME_LEN as u64 + 1;
    let mut out = Vec::new();
    let gzip = flate2::read::GzDecoder::new(data).take(limit).read_to_end(&mut out);
    if gzip.is_err() || out.is_empty() {
        out.clear();
        flate2::read::ZlibDecoder::new(data)
            .take(limit)
            .read_to_end(&mut out)
            .map_err(Error::Inflate)?;
    }
    if out.len() > MAX_FRAME_LEN {
        return Err(Error::Inflate(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("inflated payload exceeds {MAX_FRAME_LEN} bytes"),
        )));
    }
    Ok(out)
}

// ─── Encoding ─────────────────────────────────────────────────────────────────

/// `rpc_result` carrying a successful return value.
pub fn encode_result(token: Token, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(12 + body.len());
    ID_RPC_RESULT.serialize(&mut buf);
    token.0.serialize(&mut buf);
    buf.extend_from_slice(body);
    buf
}

/// `rpc_result` carrying an `rpc_error`.
pub fn encode_error(token: Token, code: i32, message: &str) -> Vec<u8> {
    let err = types::RpcError { error_code: code, error_message: message.to_owned() };
    let mut body = Vec::new();
    ID_RPC_ERROR.serialize(&mut body);
    err.serialize(&mut body);
    encode_result(token, &body)
}

/// `msg_container` holding `payloads` in order.
pub fn encode_container(payloads: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    ID_MSG_CONTAINER.serialize(&mut buf);
    (payloads.len() as i32).serialize(&mut buf);
    for p in payloads {
        (p.len() as i32).serialize(&mut buf);
        buf.extend_from_slice(p);
    }
    buf
}

/// `gzip_packed` wrapping `payload`.
pub fn encode_gzip(payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(payload)?;
    let packed = types::GzipPacked { packed_data: enc.finish()? };
    let mut buf = Vec::new();
    ID_GZIP_PACKED.serialize(&mut buf);
    packed.serialize(&mut buf);
    Ok(buf)
}
