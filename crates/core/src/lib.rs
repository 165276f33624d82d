//! Core logic: request shaping per model, response normalization and
//! turn processing.
//!
//! The two pure pieces, [`RequestBuilder`] and [`normalize_response`], do
//! no I/O and keep no state between calls. [`ChatService`] glues them to a
//! model provider for one conversation turn.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod chat;
pub mod conversation;
mod error;
mod model_client;
pub mod normalize;
pub mod profile;
mod request;

pub use chat::{ChatService, ChatServiceBuilder, TurnOutcome, UserTurn};
pub use conversation::Conversation;
pub use error::Error;
pub use model_client::{ModelClient, RetryPolicy};
pub use normalize::{NormalizedText, normalize_plain, normalize_response};
pub use profile::{ModelProfile, ModelProfiles, UnknownModelError};
pub use request::{
    DEFAULT_IMAGE_PROMPT, DEFAULT_VISION_MODEL, RequestBuilder, RequestParams,
    SYSTEM_INSTRUCTION, build_request,
};
