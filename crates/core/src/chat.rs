use std::sync::Arc;

use plainchat_model::{ImageRef, ModelProvider, Role};

use crate::conversation::Conversation;
use crate::error::Error;
use crate::model_client::{ModelClient, RetryPolicy};
use crate::normalize::{NormalizeOptions, NormalizedText, normalize_with};
use crate::profile::ModelProfiles;
use crate::request::{RequestBuilder, RequestParams};

/// What the user submitted for one turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserTurn {
    /// The typed text, may be empty when an image is attached.
    pub text: String,
    /// An optional attached image.
    pub image: Option<ImageRef>,
}

impl UserTurn {
    /// Creates a text-only turn.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    /// Attaches an image.
    #[inline]
    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = Some(image);
        self
    }
}

/// The result of a successful turn.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    /// The conversation extended with the user message (as sent) and the
    /// raw assistant reply.
    pub conversation: Conversation,
    /// The reply, ready to display.
    pub reply: NormalizedText,
    /// The reply as the model produced it.
    pub raw_reply: String,
    /// The model id the request was sent to.
    pub model: String,
    /// Whether the model id had no profile and the fallback was used.
    pub used_fallback_profile: bool,
}

/// [`ChatService`] builder.
pub struct ChatServiceBuilder {
    provider_fn: Box<dyn FnOnce(RetryPolicy) -> ModelClient + Send>,
    retry_policy: RetryPolicy,
    request_builder: RequestBuilder,
    normalize_options: NormalizeOptions,
}

impl ChatServiceBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            provider_fn: Box::new(move |policy| {
                ModelClient::with_retry_policy(provider, policy)
            }),
            retry_policy: RetryPolicy::default(),
            request_builder: RequestBuilder::default(),
            normalize_options: NormalizeOptions::default(),
        }
    }

    /// Sets how transient failures are retried.
    #[inline]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Uses a custom profile table.
    #[inline]
    pub fn with_profiles(mut self, profiles: Arc<ModelProfiles>) -> Self {
        self.request_builder = self.request_builder.with_profiles(profiles);
        self
    }

    /// Sets the model that receives requests carrying an image.
    #[inline]
    pub fn with_vision_model<S: Into<String>>(mut self, model: S) -> Self {
        self.request_builder = self.request_builder.with_vision_model(model);
        self
    }

    /// Sets how replies are normalized.
    #[inline]
    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize_options = options;
        self
    }

    /// Builds the service.
    #[inline]
    pub fn build(self) -> ChatService {
        ChatService {
            client: (self.provider_fn)(self.retry_policy),
            request_builder: Arc::new(self.request_builder),
            normalize_options: self.normalize_options,
        }
    }
}

/// Processes conversation turns against a model provider.
///
/// The service keeps no conversation state: every call receives the
/// conversation so far and returns the extended one. It is cheap to clone
/// and can be shared between sessions.
#[derive(Clone)]
pub struct ChatService {
    client: ModelClient,
    request_builder: Arc<RequestBuilder>,
    normalize_options: NormalizeOptions,
}

impl ChatService {
    /// Returns the request builder in use.
    #[inline]
    pub fn request_builder(&self) -> &RequestBuilder {
        &self.request_builder
    }

    /// Runs one turn: builds the request, calls the model and normalizes
    /// the reply.
    ///
    /// On failure the caller still owns the untouched `conversation`.
    pub async fn process_turn(
        &self,
        conversation: &Conversation,
        turn: UserTurn,
        params: &RequestParams,
    ) -> Result<TurnOutcome, Error> {
        let UserTurn { text, image } = turn;
        if text.trim().is_empty() && image.is_none() {
            return Err(Error::invalid_argument("nothing to send"));
        }

        let mut pending = conversation.clone();
        pending.push_user(text);
        let request =
            self.request_builder
                .build(&pending, params, image.as_ref())?;

        let model = request.model().to_owned();
        let used_fallback_profile = request.used_fallback_profile();
        // The user message as it was sent, image parts included.
        let sent_user = request
            .messages()
            .iter()
            .rev()
            .find(|msg| msg.role == Role::User)
            .cloned();

        info!(model = %model, history = conversation.len(), "processing turn");
        let completion = self.client.send_request(request).await?;
        debug!(
            reported_model = %completion.model,
            chars = completion.text.len(),
            "got completion"
        );

        let reply = normalize_with(&completion.text, &self.normalize_options);
        let mut next = conversation.clone();
        if let Some(sent_user) = sent_user {
            next.push(sent_user);
        }
        next.push_assistant(completion.text.clone());

        Ok(TurnOutcome {
            conversation: next,
            reply,
            raw_reply: completion.text,
            model,
            used_fallback_profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use plainchat_model::{Content, ContentPart, ErrorKind, Message};
    use plainchat_test_model::{PresetFailure, PresetReply, TestModelProvider};

    use super::*;
    use crate::request::DEFAULT_VISION_MODEL;

    fn service(provider: &TestModelProvider) -> ChatService {
        ChatServiceBuilder::with_model_provider(provider.clone())
            .with_retry_policy(RetryPolicy::NONE)
            .build()
    }

    #[tokio::test]
    async fn test_process_turn() {
        let mut provider = TestModelProvider::default();
        provider.add_text_reply("Hello!\n\n\n\nNice to meet you.\nReally.");
        let service = service(&provider);

        let conversation = Conversation::new();
        let outcome = service
            .process_turn(
                &conversation,
                UserTurn::text("Hi"),
                &RequestParams::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            outcome.reply.as_str(),
            "<p>Hello!</p><p>Nice to meet you. Really.</p>"
        );
        assert_eq!(outcome.model, "gpt-5-mini");
        assert!(!outcome.used_fallback_profile);
        assert_eq!(
            outcome.conversation.messages(),
            [
                Message::user("Hi"),
                Message::assistant("Hello!\n\n\n\nNice to meet you.\nReally."),
            ]
        );
        assert!(conversation.is_empty());

        let sent = provider.received_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].temperature(), None);
    }

    #[tokio::test]
    async fn test_history_is_sent() {
        let mut provider = TestModelProvider::default();
        provider.add_text_reply("First");
        provider.add_text_reply("Second");
        let service = service(&provider);
        let params = RequestParams {
            model: "gpt-4o-mini".to_owned(),
            ..Default::default()
        };

        let first = service
            .process_turn(&Conversation::new(), UserTurn::text("one"), &params)
            .await
            .unwrap();
        let second = service
            .process_turn(&first.conversation, UserTurn::text("two"), &params)
            .await
            .unwrap();
        assert_eq!(second.conversation.len(), 4);

        let sent = provider.received_requests();
        // System instruction plus the three turns so far.
        assert_eq!(sent[1].messages().len(), 4);
        assert_eq!(sent[1].messages()[2], Message::assistant("First"));
        assert_eq!(sent[1].temperature(), Some(0.7));
    }

    #[tokio::test]
    async fn test_image_turn_is_recorded_as_sent() {
        let mut provider = TestModelProvider::default();
        provider.add_text_reply("A cat.");
        let service = service(&provider);
        let image = ImageRef::Url("data:image/png;base64,YWJj".to_owned());

        let outcome = service
            .process_turn(
                &Conversation::new(),
                UserTurn::text("").with_image(image.clone()),
                &RequestParams::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.model, DEFAULT_VISION_MODEL);
        assert_eq!(
            outcome.conversation.messages()[0].content,
            Content::Parts(vec![
                ContentPart::Text(crate::DEFAULT_IMAGE_PROMPT.to_owned()),
                ContentPart::Image(image),
            ])
        );
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_conversation() {
        let mut provider = TestModelProvider::default();
        provider.add_reply(PresetReply::failure(PresetFailure::Authentication));
        let service = service(&provider);

        let conversation = Conversation::with_greeting("Hi!");
        let err = service
            .process_turn(
                &conversation,
                UserTurn::text("Hello"),
                &RequestParams::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RemoteService(_)));
        assert_eq!(err.remote_kind(), Some(ErrorKind::Authentication));
        assert_eq!(conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_turn_is_rejected() {
        let provider = TestModelProvider::default();
        let service = service(&provider);
        let err = service
            .process_turn(
                &Conversation::new(),
                UserTurn::text("  \n"),
                &RequestParams::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(provider.received_requests().is_empty());
    }
}
