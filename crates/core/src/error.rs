use std::fmt::{self, Display};

use plainchat_model::{ErrorKind, ModelProviderError};

/// Errors surfaced by the core.
#[derive(Debug)]
pub enum Error {
    /// The caller broke the calling contract, e.g. passed a non-finite
    /// temperature or nothing to send.
    InvalidArgument(String),
    /// The environment is missing something required, usually the API
    /// credential.
    Configuration(String),
    /// The completion service failed.
    RemoteService(Box<dyn ModelProviderError>),
}

impl Error {
    #[inline]
    pub(crate) fn invalid_argument<S: Into<String>>(reason: S) -> Self {
        Self::InvalidArgument(reason.into())
    }

    /// Creates a [`Error::Configuration`] error.
    #[inline]
    pub fn configuration<S: Into<String>>(reason: S) -> Self {
        Self::Configuration(reason.into())
    }

    /// Returns the provider error kind, if the completion service failed.
    #[inline]
    pub fn remote_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::RemoteService(err) => Some(err.kind()),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(reason) => {
                write!(f, "Invalid argument: {reason}")
            }
            Error::Configuration(reason) => {
                write!(f, "Configuration error: {reason}")
            }
            Error::RemoteService(err) => {
                write!(f, "Completion service error ({}): {err}", err.kind())
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<Box<dyn ModelProviderError>> for Error {
    #[inline]
    fn from(err: Box<dyn ModelProviderError>) -> Self {
        Self::RemoteService(err)
    }
}
