//! An abstraction layer for chat completion services.
//!
//! This crate establishes the vocabulary shared by the request builder,
//! the model providers and the front-ends: messages, multimodal content,
//! the fully-resolved completion request and the provider traits.
//!
//! Types in this crate don't define any behavior beyond construction and
//! conversion. Request shaping and response formatting live in their own
//! crate.

#![deny(missing_docs)]

mod error;
mod image;
mod message;
mod provider;
mod request;
mod response;

pub use error::*;
pub use image::*;
pub use message::*;
pub use provider::*;
pub use request::*;
pub use response::*;
