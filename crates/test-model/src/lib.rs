//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use plainchat_model::{
    Completion, CompletionRequest, ErrorKind, ModelProvider,
    ModelProviderError,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<PresetFailure> for Error {
    fn from(failure: PresetFailure) -> Self {
        let kind = match failure {
            PresetFailure::Timeout => ErrorKind::Timeout,
            PresetFailure::Authentication => ErrorKind::Authentication,
            PresetFailure::RateLimitExceeded => ErrorKind::RateLimitExceeded,
            PresetFailure::InvalidRequest => ErrorKind::InvalidRequest,
            PresetFailure::Moderated => ErrorKind::Moderated,
            PresetFailure::Other => ErrorKind::Other,
        };
        Self {
            message: "preset failure",
            kind,
        }
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<PresetReply>,
    received: Vec<CompletionRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request, in order. If the script runs out,
/// an error will be returned. Every request is recorded and can be
/// inspected with [`TestModelProvider::received_requests`].
///
/// Clones share the same script, so a test can keep a handle after moving
/// the provider into a client.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_reply(&mut self, reply: PresetReply) {
        self.lock().replies.push_back(reply);
    }

    #[inline]
    pub fn add_text_reply<S: Into<String>>(&mut self, text: S) {
        self.add_reply(PresetReply::text(text));
    }

    /// Holds every reply back for `duration`.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far.
    pub fn received_requests(&self) -> Vec<CompletionRequest> {
        self.lock().received.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // A panicking test may poison the lock, the script is still usable.
        self.script.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Debug for TestModelProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestModelProvider")
            .field("pending_replies", &self.lock().replies.len())
            .field("delay", &self.delay)
            .finish()
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &CompletionRequest,
    ) -> impl Future<Output = Result<Completion, Self::Error>> + Send + 'static
    {
        let reply = {
            let mut script = self.lock();
            script.received.push(req.clone());
            script.replies.pop_front()
        };
        let model = req.model().to_owned();
        let delay = self.delay.unwrap_or(Duration::from_millis(1));

        async move {
            sleep(delay).await;
            match reply {
                Some(PresetReply::Text(text)) => Ok(Completion { text, model }),
                Some(PresetReply::Failure(failure)) => Err(failure.into()),
                None => Err(Error {
                    message: "no enough replies",
                    kind: ErrorKind::Other,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use plainchat_model::{Message, TokenLimit, TokenLimitParam};

    use super::*;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest::new(
            "gpt-test",
            vec![Message::user(text)],
            Some(0.5),
            TokenLimit {
                param: TokenLimitParam::MaxTokens,
                value: 32,
            },
            false,
        )
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_text_reply("Hello, world!");
        provider.add_reply(PresetReply::failure(PresetFailure::Timeout));

        let completion =
            provider.send_request(&request("Hi")).await.unwrap();
        assert_eq!(completion.text, "Hello, world!");
        assert_eq!(completion.model, "gpt-test");

        let err = provider.send_request(&request("Again")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let err = provider.send_request(&request("More")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);

        let received = provider.received_requests();
        assert_eq!(received.len(), 3);
        assert_eq!(received[1], request("Again"));
    }

    #[tokio::test]
    async fn test_clones_share_script() {
        let mut provider = TestModelProvider::default();
        let observer = provider.clone();
        provider.add_text_reply("ok");
        provider.send_request(&request("Hi")).await.unwrap();
        assert_eq!(observer.received_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_moderated_failure() {
        let mut provider = TestModelProvider::default();
        provider.add_reply(PresetReply::failure(PresetFailure::Moderated));
        let err = provider.send_request(&request("Hi")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);
        assert!(!err.kind().is_transient());
    }

    #[tokio::test]
    async fn test_delay() {
        let mut provider = TestModelProvider::default();
        provider.add_text_reply("late");
        provider.set_delay(Duration::from_millis(30));

        let started = std::time::Instant::now();
        provider.send_request(&request("Hi")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
