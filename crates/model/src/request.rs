use crate::Message;

/// The name under which the output-token cap is sent.
///
/// Older and newer generations of the completion API use different
/// parameter names for the same concept, and some models reject the one
/// they don't know.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenLimitParam {
    /// `max_tokens`, understood by the older model generation.
    MaxTokens,
    /// `max_completion_tokens`, required by the newer model generation.
    MaxCompletionTokens,
}

impl TokenLimitParam {
    /// Returns the wire name of the parameter.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            TokenLimitParam::MaxTokens => "max_tokens",
            TokenLimitParam::MaxCompletionTokens => "max_completion_tokens",
        }
    }
}

/// An output-token cap bound to its parameter name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TokenLimit {
    /// The parameter to use.
    pub param: TokenLimitParam,
    /// The maximum number of tokens to generate.
    pub value: u32,
}

/// A fully-resolved request to be sent to the model provider.
///
/// The request can only be constructed as a whole and is never mutated
/// afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: Option<f32>,
    token_limit: TokenLimit,
    used_fallback_profile: bool,
}

impl CompletionRequest {
    /// Creates a new request.
    #[inline]
    pub fn new(
        model: impl Into<String>,
        messages: Vec<Message>,
        temperature: Option<f32>,
        token_limit: TokenLimit,
        used_fallback_profile: bool,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature,
            token_limit,
            used_fallback_profile,
        }
    }

    /// The model id to call.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The input messages, system instruction first.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The sampling temperature, `None` when the model must not receive one.
    #[inline]
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// The output-token cap.
    #[inline]
    pub fn token_limit(&self) -> TokenLimit {
        self.token_limit
    }

    /// Whether the model id was missing from the profile table and a
    /// conservative default profile was used instead.
    #[inline]
    pub fn used_fallback_profile(&self) -> bool {
        self.used_fallback_profile
    }
}
