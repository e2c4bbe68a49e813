#![doc(html_root_url = "https://docs.rs/protoforge/0.4.2")]

//! A Protocol Buffers implementation for the Rust language.
//!
//! `protoforge` is the runtime half of the protoforge toolchain: the library
//! that code generated by `protoc-gen-protoforge` (see the `protoforge-build`
//! crate) calls into. For every message the generator emits a plain struct
//! with an implementation of [`Message`] (the proto3 binary wire format) and
//! of [`JsonMessage`] (the canonical proto3 JSON mapping).
//!
//! The runtime is self-contained: it knows nothing about descriptors or code
//! generation. Everything in [`encoding`] and [`json`] exists to be named
//! from generated code, but the entry points ([`Message::encode_to_vec`],
//! [`Message::decode`], [`JsonMessage::to_json`], [`JsonMessage::from_json`])
//! are ordinary public API.

// Re-export the bytes crate for use within generated code.
pub use bytes;

mod error;
mod message;
mod open_enum;

pub mod encoding;
pub mod json;

pub use crate::error::{DecodeError, EncodeError, UnknownEnumValue};
pub use crate::json::{JsonError, JsonMessage};
pub use crate::message::Message;
pub use crate::open_enum::{Enumeration, OpenEnum};

// 100 is the default recursion limit in the C++ implementation.
const RECURSION_LIMIT: u32 = 100;
