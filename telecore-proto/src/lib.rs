//! Session and framing layer between typed requests and raw payloads.
//!
//! This crate handles:
//! * Correlation tokens and the `invokeWithToken` request wrapper
//! * Classifying inbound payloads into correlated results and pushes,
//!   including `msg_container` batches and `gzip_packed` bodies
//! * Length-prefixed framing for byte-stream transports
//!
//! It is transport-agnostic: bring your own TCP socket or channel.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod message;
pub mod session;
pub mod transport;

pub use envelope::Inbound;
pub use message::{Message, Token};
pub use session::Session;
