use plainchat_model::{
    Completion, CompletionRequest, Content, ContentPart, ErrorKind, Role,
    TokenLimitParam,
};
use serde::{Deserialize, Serialize};

use crate::Error;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletion {
    pub id: Option<String>,
    pub model: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
    pub refusal: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ErrorBody {
    pub error: ApiError,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ApiError {
    pub message: String,
    pub r#type: Option<String>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Part {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<Part>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum Message {
    System { content: MessageContent },
    User { content: MessageContent },
    Assistant { content: MessageContent },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

// -----------
// Conversions
// -----------

pub fn create_request(req: &CompletionRequest) -> ChatCompletionRequest {
    let limit = req.token_limit();
    let (max_tokens, max_completion_tokens) = match limit.param {
        TokenLimitParam::MaxTokens => (Some(limit.value), None),
        TokenLimitParam::MaxCompletionTokens => (None, Some(limit.value)),
    };
    ChatCompletionRequest {
        model: req.model().to_owned(),
        messages: req
            .messages()
            .iter()
            .map(|msg| create_message(msg.role, &msg.content))
            .collect(),
        temperature: req.temperature(),
        max_tokens,
        max_completion_tokens,
    }
}

#[inline]
fn create_message(role: Role, content: &Content) -> Message {
    let content = match content {
        Content::Text(text) => MessageContent::Text(text.clone()),
        Content::Parts(parts) => {
            MessageContent::Parts(parts.iter().map(create_part).collect())
        }
    };
    match role {
        Role::System => Message::System { content },
        Role::User => Message::User { content },
        Role::Assistant => Message::Assistant { content },
    }
}

#[inline]
fn create_part(part: &ContentPart) -> Part {
    match part {
        ContentPart::Text(text) => Part::Text { text: text.clone() },
        ContentPart::Image(image) => Part::ImageUrl {
            image_url: ImageUrl {
                url: image.to_url(),
            },
        },
    }
}

/// Extracts the generated text from a response body.
///
/// `requested_model` is reported when the service omits the model id.
pub fn into_completion(
    resp: ChatCompletion,
    requested_model: &str,
) -> Result<Completion, Error> {
    let model = resp.model.unwrap_or_else(|| requested_model.to_owned());
    let Some(choice) = resp.choices.into_iter().next() else {
        return Err(Error::new("response has no choices", ErrorKind::Other));
    };

    if let Some(text) = choice.message.content {
        return Ok(Completion { text, model });
    }
    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(Error::new(
            "response was blocked by the content filter",
            ErrorKind::Moderated,
        ));
    }
    if let Some(refusal) = choice.message.refusal {
        return Err(Error::new(
            format!("model refused: {refusal}"),
            ErrorKind::Moderated,
        ));
    }
    Err(Error::new("response has no content", ErrorKind::Other))
}
