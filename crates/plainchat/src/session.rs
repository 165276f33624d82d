use std::io;
use std::path::Path;

use plainchat_core::{
    ChatService, Conversation, Error as CoreError, RequestParams, UserTurn,
    normalize_plain,
};
use plainchat_model::ImageRef;

const GREETING: &str = "Hello! How can I help you?";

/// A line typed into the terminal session.
#[derive(Clone, Debug, PartialEq)]
pub enum Command<'a> {
    /// A message for the assistant.
    Message(&'a str),
    /// `/image <path>`: attach an image to the next message.
    Image(&'a str),
    /// `/clear`: start over.
    Clear,
    /// `/temperature <value>`.
    Temperature(f32),
    /// `/quit`.
    Quit,
    /// A slash command that can't be understood.
    Invalid(String),
}

/// Parses a line typed by the user.
pub fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Message(line);
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "quit" | "exit" => Command::Quit,
        "clear" => Command::Clear,
        "image" if arg.is_empty() => {
            Command::Invalid("usage: /image <path>".to_owned())
        }
        "image" => Command::Image(arg),
        "temperature" => match arg.parse::<f32>() {
            Ok(value) => Command::Temperature(value),
            Err(_) => Command::Invalid("usage: /temperature <0.0..2.0>".to_owned()),
        },
        _ => Command::Invalid(format!("unknown command: /{name}")),
    }
}

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    service: ChatService,
    params: RequestParams,
    greeting: Option<String>,
}

impl SessionBuilder {
    /// Creates a session builder around a chat service.
    pub fn with_chat_service(service: ChatService) -> Self {
        Self {
            service,
            params: RequestParams::default(),
            greeting: Some(GREETING.to_owned()),
        }
    }

    /// Sets the model to talk to.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.params.model = model.into();
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.params.temperature = temperature;
        self
    }

    /// Sets the assistant greeting the conversation starts with, `None`
    /// for an empty conversation.
    #[inline]
    pub fn with_greeting(mut self, greeting: Option<String>) -> Self {
        self.greeting = greeting;
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        Session {
            service: self.service,
            conversation: new_conversation(self.greeting.as_deref()),
            greeting: self.greeting,
            params: self.params,
            pending_image: None,
        }
    }
}

/// A terminal chat session.
///
/// Owns the conversation so far and the image waiting to be sent with the
/// next message.
pub struct Session {
    service: ChatService,
    conversation: Conversation,
    greeting: Option<String>,
    params: RequestParams,
    pending_image: Option<ImageRef>,
}

impl Session {
    /// Returns the greeting shown when the conversation starts.
    #[inline]
    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the request parameters in use.
    #[inline]
    pub fn params(&self) -> &RequestParams {
        &self.params
    }

    /// Whether an image waits for the next message.
    #[inline]
    pub fn has_pending_image(&self) -> bool {
        self.pending_image.is_some()
    }

    /// Reads an image file and attaches it to the next message.
    pub async fn attach_image(&mut self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let mime = image_mime(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a supported image: {}", path.display()),
            )
        })?;
        let data = tokio::fs::read(path).await?;
        debug!("attached {} ({} bytes)", path.display(), data.len());
        self.pending_image = Some(ImageRef::from_bytes(mime, data));
        Ok(())
    }

    /// Starts over with only the greeting.
    pub fn clear(&mut self) {
        self.conversation = new_conversation(self.greeting.as_deref());
        self.pending_image = None;
    }

    /// Sets the temperature for the following messages.
    ///
    /// The value is checked when the next request is built.
    #[inline]
    pub fn set_temperature(&mut self, temperature: f32) {
        self.params.temperature = temperature;
    }

    /// Sends a message with the pending image, if any, and returns the
    /// reply as plain text.
    ///
    /// On failure the conversation is unchanged and the image stays
    /// attached.
    pub async fn send(&mut self, text: &str) -> Result<String, CoreError> {
        let image = self.pending_image.take();
        let turn = UserTurn {
            text: text.to_owned(),
            image: image.clone(),
        };

        match self
            .service
            .process_turn(&self.conversation, turn, &self.params)
            .await
        {
            Ok(outcome) => {
                self.conversation = outcome.conversation;
                Ok(normalize_plain(&outcome.raw_reply))
            }
            Err(err) => {
                self.pending_image = image;
                Err(err)
            }
        }
    }
}

fn new_conversation(greeting: Option<&str>) -> Conversation {
    match greeting {
        Some(greeting) => Conversation::with_greeting(greeting),
        None => Conversation::new(),
    }
}

fn image_mime(path: &Path) -> Option<mime::Mime> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "webp" => "image/webp".parse().ok()?,
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use plainchat_core::{ChatServiceBuilder, RetryPolicy};
    use plainchat_model::{Content, ContentPart, Message, Role};
    use plainchat_test_model::{PresetFailure, PresetReply, TestModelProvider};

    use super::*;

    fn session(provider: &TestModelProvider) -> Session {
        let service = ChatServiceBuilder::with_model_provider(provider.clone())
            .with_retry_policy(RetryPolicy::NONE)
            .build();
        SessionBuilder::with_chat_service(service)
            .with_model("gpt-4o-mini")
            .build()
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  hello \n"), Command::Message("hello"));
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command("/clear"), Command::Clear);
        assert_eq!(
            parse_command("/image  ./cat photo.png"),
            Command::Image("./cat photo.png")
        );
        assert_eq!(parse_command("/temperature 1.5"), Command::Temperature(1.5));
        assert!(matches!(parse_command("/image"), Command::Invalid(_)));
        assert!(matches!(parse_command("/temperature hot"), Command::Invalid(_)));
        assert!(matches!(parse_command("/dance"), Command::Invalid(_)));
    }

    #[tokio::test]
    async fn test_send_keeps_history() {
        let mut provider = TestModelProvider::default();
        provider.add_text_reply("Sure.\n\n\n\nHere you go.");
        provider.add_text_reply("Bye.");
        let mut session = session(&provider);

        let reply = session.send("Help me").await.unwrap();
        assert_eq!(reply, "Sure.\n\nHere you go.");
        session.send("Thanks").await.unwrap();

        // Greeting plus two full turns.
        assert_eq!(session.conversation().len(), 5);
        assert_eq!(
            session.conversation().messages()[0],
            Message::assistant(GREETING)
        );
        let sent = provider.received_requests();
        assert_eq!(sent[1].messages().len(), 5);
    }

    #[tokio::test]
    async fn test_clear() {
        let mut provider = TestModelProvider::default();
        provider.add_text_reply("Hi.");
        let mut session = session(&provider);
        session.send("Hello").await.unwrap();

        session.clear();
        assert_eq!(session.conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_attach_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.PNG");
        std::fs::write(&path, b"abc").unwrap();

        let mut provider = TestModelProvider::default();
        provider.add_text_reply("A cat.");
        let mut session = session(&provider);
        session.attach_image(&path).await.unwrap();
        assert!(session.has_pending_image());

        session.send("").await.unwrap();
        assert!(!session.has_pending_image());

        let sent = provider.received_requests();
        assert_eq!(sent[0].model(), "gpt-4o");
        let user = sent[0]
            .messages()
            .iter()
            .find(|msg| msg.role == Role::User)
            .unwrap();
        let Content::Parts(parts) = &user.content else {
            panic!("expected content parts, got {:?}", user.content);
        };
        let ContentPart::Image(image) = &parts[1] else {
            panic!("expected an image part, got {:?}", parts[1]);
        };
        assert_eq!(image.to_url(), "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_attach_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"abc").unwrap();

        let provider = TestModelProvider::default();
        let mut session = session(&provider);
        let err = session.attach_image(&path).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(!session.has_pending_image());
    }

    #[tokio::test]
    async fn test_failure_keeps_image_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.jpg");
        std::fs::write(&path, b"abc").unwrap();

        let mut provider = TestModelProvider::default();
        provider.add_reply(PresetReply::failure(PresetFailure::Other));
        let mut session = session(&provider);
        session.attach_image(&path).await.unwrap();

        assert!(session.send("What is this?").await.is_err());
        assert!(session.has_pending_image());
        assert_eq!(session.conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_temperature() {
        let provider = TestModelProvider::default();
        let mut session = session(&provider);
        session.set_temperature(3.0);

        let err = session.send("Hi").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert!(provider.received_requests().is_empty());
    }
}
