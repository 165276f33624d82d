use std::sync::Arc;

use plainchat_model::{
    CompletionRequest, Content, ContentPart, ImageRef, Message, Role,
    TokenLimit,
};

use crate::conversation::Conversation;
use crate::error::Error;
use crate::profile::ModelProfiles;

/// The instruction sent as the system message of every request.
pub const SYSTEM_INSTRUCTION: &str = "\
You are a friendly and helpful AI assistant.

Important guidelines:
1. Never use markdown formatting (**, *, #, -, `, [] and the like).
2. Write in plain, natural text that is easy to read.
3. Keep line breaks to a minimum. One blank line between paragraphs is enough.
4. Never use several blank lines in a row.
5. Keep the answer concise and flowing.";

/// The user text sent along an image when the user typed nothing.
pub const DEFAULT_IMAGE_PROMPT: &str = "Please analyze this image.";

/// The model that receives every request carrying an image.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";

/// Caller-chosen sampling parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestParams {
    /// The requested model id. Images override it.
    pub model: String,
    /// Sampling temperature in `0.0..=2.0`. Dropped for models that
    /// reject it.
    pub temperature: f32,
    /// Maximum number of tokens to generate.
    pub max_output_tokens: u32,
}

impl Default for RequestParams {
    #[inline]
    fn default() -> Self {
        Self {
            model: "gpt-5-mini".to_owned(),
            temperature: 0.7,
            max_output_tokens: 1000,
        }
    }
}

/// Shapes a conversation into the request for a given model.
///
/// The builder is immutable once created and holds no per-request state,
/// so one instance can serve concurrent requests.
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    profiles: Arc<ModelProfiles>,
    vision_model: String,
}

impl Default for RequestBuilder {
    #[inline]
    fn default() -> Self {
        Self {
            profiles: ModelProfiles::builtin(),
            vision_model: DEFAULT_VISION_MODEL.to_owned(),
        }
    }
}

impl RequestBuilder {
    /// Creates a builder with the built-in profile table.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom profile table.
    #[inline]
    pub fn with_profiles(mut self, profiles: Arc<ModelProfiles>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Sets the model that receives requests carrying an image.
    #[inline]
    pub fn with_vision_model<S: Into<String>>(mut self, model: S) -> Self {
        self.vision_model = model.into();
        self
    }

    /// Returns the profile table in use.
    #[inline]
    pub fn profiles(&self) -> &ModelProfiles {
        &self.profiles
    }

    /// Builds the request for the next assistant turn.
    ///
    /// When `image` is given, the latest user message becomes a text part
    /// followed by the image (a new user message is appended if the
    /// conversation doesn't end with one) and the vision model is used no
    /// matter which model was requested.
    ///
    /// Unknown model ids don't fail: the fallback profile is used and the
    /// request reports it through
    /// [`CompletionRequest::used_fallback_profile`].
    pub fn build(
        &self,
        conversation: &Conversation,
        params: &RequestParams,
        image: Option<&ImageRef>,
    ) -> Result<CompletionRequest, Error> {
        if params.max_output_tokens == 0 {
            return Err(Error::invalid_argument(
                "max_output_tokens must be positive",
            ));
        }

        let mut history = conversation.messages().to_vec();
        let model = match image {
            Some(image) => {
                attach_image(&mut history, image);
                if params.model != self.vision_model {
                    debug!(
                        requested = %params.model,
                        vision_model = %self.vision_model,
                        "image attached, switching model"
                    );
                }
                self.vision_model.as_str()
            }
            None => params.model.as_str(),
        };
        if history.last().map(|msg| msg.role) != Some(Role::User) {
            return Err(Error::invalid_argument(
                "conversation doesn't end with a user message",
            ));
        }

        let (profile, used_fallback_profile) = match self.profiles.get(model) {
            Ok(profile) => (*profile, false),
            Err(err) => {
                warn!("{err}, using the fallback profile");
                (self.profiles.fallback(), true)
            }
        };
        // Models without temperature support drop the value unchecked.
        if profile.supports_temperature
            && !(0.0..=2.0).contains(&params.temperature)
        {
            return Err(Error::invalid_argument(format!(
                "temperature must be within 0.0..=2.0, got {}",
                params.temperature
            )));
        }

        if !profile.supports_vision {
            // The image of this turn always goes through, it selected the
            // model in the first place.
            let keep_last = usize::from(image.is_some());
            let end = history.len() - keep_last;
            for msg in &mut history[..end] {
                if msg.content.has_image() {
                    trace!("dropping image parts for {model}");
                    msg.content = Content::Text(msg.content.text());
                }
            }
        }

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(SYSTEM_INSTRUCTION));
        messages.extend(history);

        let temperature =
            profile.supports_temperature.then_some(params.temperature);
        let token_limit = TokenLimit {
            param: profile.token_limit,
            value: params.max_output_tokens,
        };

        Ok(CompletionRequest::new(
            model,
            messages,
            temperature,
            token_limit,
            used_fallback_profile,
        ))
    }
}

/// Builds a request with the built-in profile table.
#[inline]
pub fn build_request(
    conversation: &Conversation,
    params: &RequestParams,
    image: Option<&ImageRef>,
) -> Result<CompletionRequest, Error> {
    RequestBuilder::default().build(conversation, params, image)
}

fn attach_image(history: &mut Vec<Message>, image: &ImageRef) {
    let text = match history.last() {
        Some(msg) if msg.role == Role::User => history
            .pop()
            .map(|msg| msg.content.text())
            .unwrap_or_default(),
        _ => String::new(),
    };
    let text = if text.trim().is_empty() {
        DEFAULT_IMAGE_PROMPT.to_owned()
    } else {
        text
    };
    history.push(Message::user(Content::Parts(vec![
        ContentPart::Text(text),
        ContentPart::Image(image.clone()),
    ])));
}
