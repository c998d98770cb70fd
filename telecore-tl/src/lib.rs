//! Wire types, functions and enums for the telecore protocol.
//!
//! Every definition here mirrors one line of `tl/api.tl`. Constructor ids
//! are either explicit in the schema or the CRC32 of the definition's left
//! hand side; `tests/schema_ids.rs` keeps the two in sync.
//!
//! # Overview
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`types`]     | Concrete constructors (bare types) as `struct`s            |
//! | [`functions`] | RPC functions as `struct`s implementing [`RemoteCall`]     |
//! | [`enums`]     | Boxed types as `enum`s implementing [`Deserializable`]     |
//!
//! # Raw usage
//!
//! ```rust
//! use telecore_tl::{functions, Serializable};
//!
//! let req = functions::SetAuthenticationPhoneNumber {
//!     phone_number: "+15551234567".into(),
//! };
//! let bytes = req.to_bytes();
//! assert_eq!(&bytes[..4], &0xfb59d35du32.to_le_bytes());
//! ```

#![deny(unsafe_code)]
#![allow(clippy::large_enum_variant)]

#[macro_use]
mod macros;

pub mod deserialize;
pub mod serialize;
pub mod types;
pub mod enums;
pub mod functions;

pub use deserialize::{Cursor, Deserializable};
pub use serialize::Serializable;

// ─── Core traits ──────────────────────────────────────────────────────────────

/// Every wire type has a unique 32-bit constructor ID.
pub trait Identifiable {
    /// The constructor ID as specified in the schema.
    const CONSTRUCTOR_ID: u32;
}

/// Marks a function type that can be sent to the backend as an RPC call.
///
/// `Return` is the type the backend will respond with.
pub trait RemoteCall: Serializable {
    /// The deserialized response type.
    type Return: Deserializable;
}
