use serde::{Deserialize, Serialize};

use crate::ImageRef;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The system instructions.
    System,
    /// The end user.
    User,
    /// The model.
    Assistant,
}

/// One piece of a multimodal message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContentPart {
    /// A text fragment.
    Text(String),
    /// An attached image.
    Image(ImageRef),
}

/// The content of a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Content {
    /// A plain text message.
    Text(String),
    /// An ordered sequence of parts, used when the message carries images.
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Returns `true` if any part of this content is an image.
    #[inline]
    pub fn has_image(&self) -> bool {
        match self {
            Content::Text(_) => false,
            Content::Parts(parts) => {
                parts.iter().any(|p| matches!(p, ContentPart::Image(_)))
            }
        }
    }

    /// Returns the text of this content, joining text parts with a space
    /// and skipping images.
    pub fn text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text(text) => Some(text.as_str()),
                    ContentPart::Image(_) => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl From<String> for Content {
    #[inline]
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl From<&str> for Content {
    #[inline]
    fn from(value: &str) -> Self {
        Content::Text(value.to_owned())
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Message {
    /// The author of the message.
    pub role: Role,
    /// The message body.
    pub content: Content,
}

impl Message {
    /// Creates a system message.
    #[inline]
    pub fn system<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(text.into()),
        }
    }

    /// Creates a user message.
    #[inline]
    pub fn user<C: Into<Content>>(content: C) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[inline]
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(text.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_text() {
        let content = Content::Parts(vec![
            ContentPart::Text("look".to_owned()),
            ContentPart::Image(ImageRef::Url("https://x/y.png".to_owned())),
            ContentPart::Text("here".to_owned()),
        ]);
        assert!(content.has_image());
        assert_eq!(content.text(), "look here");

        let content = Content::from("hi");
        assert!(!content.has_image());
        assert_eq!(content.text(), "hi");
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }
}
