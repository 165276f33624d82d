use std::fmt::{self, Display, Formatter};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request did not finish in time.
    Timeout,
    /// The credential was rejected by the service.
    Authentication,
    /// The model provider is rate limited, or the quota is used up.
    RateLimitExceeded,
    /// The service refused the request payload.
    InvalidRequest,
    /// The content is moderated.
    Moderated,
    /// Any other errors.
    Other,
}

impl ErrorKind {
    /// Returns `true` if sending the same request again may succeed.
    #[inline]
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::RateLimitExceeded)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Timeout => write!(f, "Request timed out"),
            ErrorKind::Authentication => write!(f, "Authentication failed"),
            ErrorKind::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            ErrorKind::InvalidRequest => write!(f, "Invalid request"),
            ErrorKind::Moderated => write!(f, "Content moderated"),
            ErrorKind::Other => write!(f, "Other error"),
        }
    }
}
