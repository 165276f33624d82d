use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::future::retry_notify;
use plainchat_model::{
    Completion, CompletionRequest, ModelProvider, ModelProviderError,
};
use tracing::Instrument;

type SendRequestResult = Result<Completion, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(CompletionRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// How a failed request is retried.
///
/// Only transient failures (timeouts and rate limits) are retried, with
/// exponential backoff. Everything else is returned right away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retrying.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Give up once this much time has passed since the first attempt.
    pub max_elapsed: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: RetryPolicy = RetryPolicy {
        max_attempts: 1,
        initial_interval: Duration::ZERO,
        max_elapsed: Duration::ZERO,
    };
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(500),
            max_elapsed: Duration::from_secs(30),
        }
    }
}

/// A wrapper around a model provider that retries transient failures
/// and provides a type-erased interface for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    /// Wraps a provider with the default [`RetryPolicy`].
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        Self::with_retry_policy(provider, RetryPolicy::default())
    }

    /// Wraps a provider.
    pub fn with_retry_policy<P: ModelProvider + 'static>(
        provider: P,
        policy: RetryPolicy,
    ) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let provider = Arc::new(provider);
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let provider = Arc::clone(&provider);
            let span = debug_span!(
                "completion",
                model = %req.model(),
                messages = req.messages().len()
            );
            Box::pin(
                async move {
                    trace!("sending request: {req:?}");
                    send_with_retry(provider.as_ref(), &req, policy).await
                }
                .instrument(span),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and waits for the completion.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. Dropping the future aborts the pending
    /// attempt and any further retries.
    #[inline]
    pub async fn send_request(
        &self,
        req: CompletionRequest,
    ) -> Result<Completion, Box<dyn ModelProviderError>> {
        (self.handler_fn)(req).await
    }
}

async fn send_with_retry<P: ModelProvider>(
    provider: &P,
    req: &CompletionRequest,
    policy: RetryPolicy,
) -> SendRequestResult {
    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_interval)
        .with_max_elapsed_time(Some(policy.max_elapsed))
        .build();

    let mut attempt = 0;
    let operation = || {
        attempt += 1;
        let is_last = attempt >= policy.max_attempts;
        let fut = provider.send_request(req);
        async move {
            fut.await.map_err(|err| {
                if err.kind().is_transient() && !is_last {
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        }
    };
    let notify = |err: P::Error, delay: Duration| {
        warn!("request failed ({}), retrying in {delay:?}: {err}", err.kind());
    };

    match retry_notify(backoff, operation, notify).await {
        Ok(completion) => {
            trace!("finished a request");
            Ok(completion)
        }
        Err(err) => {
            error!("got an error: {err:?}");
            Err(Box::new(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use plainchat_model::{
        ErrorKind, Message, TokenLimit, TokenLimitParam,
    };
    use plainchat_test_model::{PresetFailure, PresetReply, TestModelProvider};

    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            "gpt-4o",
            vec![Message::user("Hi")],
            None,
            TokenLimit {
                param: TokenLimitParam::MaxCompletionTokens,
                value: 10,
            },
            false,
        )
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_interval: Duration::from_millis(1),
            max_elapsed: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_text_reply("How are you?");
        let client = ModelClient::new(provider.clone());

        let completion = client.send_request(request()).await.unwrap();
        assert_eq!(completion.text, "How are you?");
        assert_eq!(provider.received_requests(), [request()]);
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let mut provider = TestModelProvider::default();
        provider.add_reply(PresetReply::failure(PresetFailure::RateLimitExceeded));
        provider.add_reply(PresetReply::failure(PresetFailure::Timeout));
        provider.add_text_reply("finally");
        let client =
            ModelClient::with_retry_policy(provider.clone(), fast_policy(3));

        let completion = client.send_request(request()).await.unwrap();
        assert_eq!(completion.text, "finally");
        assert_eq!(provider.received_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut provider = TestModelProvider::default();
        for _ in 0..5 {
            provider.add_reply(PresetReply::failure(
                PresetFailure::RateLimitExceeded,
            ));
        }
        let client =
            ModelClient::with_retry_policy(provider.clone(), fast_policy(2));

        let err = client.send_request(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(provider.received_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let mut provider = TestModelProvider::default();
        provider.add_reply(PresetReply::failure(PresetFailure::Authentication));
        provider.add_text_reply("never reached");
        let client =
            ModelClient::with_retry_policy(provider.clone(), fast_policy(3));

        let err = client.send_request(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(provider.received_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let mut provider = TestModelProvider::default();
        provider.add_reply(PresetReply::failure(PresetFailure::Timeout));
        let client =
            ModelClient::with_retry_policy(provider.clone(), RetryPolicy::NONE);

        let err = client.send_request(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(provider.received_requests().len(), 1);
    }
}
