use serde::{Deserialize, Serialize};

/// The preset reply for one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetReply {
    /// The service answers with this text.
    #[serde(rename = "text")]
    Text(String),
    /// The service fails with an error of this kind.
    #[serde(rename = "failure")]
    Failure(PresetFailure),
}

/// Mirrors [`plainchat_model::ErrorKind`] in a serializable form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetFailure {
    Timeout,
    Authentication,
    RateLimitExceeded,
    InvalidRequest,
    Moderated,
    Other,
}

impl PresetReply {
    /// Creates a successful reply.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::Text(text.into())
    }

    /// Creates a failed reply.
    #[inline]
    pub fn failure(kind: PresetFailure) -> Self {
        Self::Failure(kind)
    }
}
