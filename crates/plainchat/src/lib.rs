//! A plain-text chat front-end for OpenAI-compatible models.
//!
//! The crate ships a terminal REPL and a small web service. And you can
//! also use it as a library: [`AppConfig`] wires a [`core::ChatService`]
//! from the environment and [`Session`] keeps a conversation going.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod config;
#[cfg(feature = "server")]
pub mod server;
mod session;

pub use config::{AppConfig, ConfigError};
pub use session::{Command, Session, SessionBuilder, parse_command};

/// Re-exports of [`plainchat_core`] crate.
pub mod core {
    pub use plainchat_core::*;
}
