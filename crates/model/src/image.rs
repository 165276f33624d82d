use std::fmt::{self, Debug, Display, Formatter};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use mime::Mime;

/// A reference to an image attached to a user message.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ImageRef {
    /// A `data:` URI or a remote URL that the service can fetch.
    Url(String),
    /// Raw encoded image bytes (PNG, JPEG, ...).
    Encoded {
        /// The media type of `data`.
        mime: Mime,
        /// The encoded image.
        data: Bytes,
    },
}

/// Error returned when a string is not a usable image reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidImageError(String);

impl Display for InvalidImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "invalid image: {}", self.0)
    }
}

impl std::error::Error for InvalidImageError {}

impl ImageRef {
    /// Creates an image reference from encoded bytes.
    #[inline]
    pub fn from_bytes(mime: Mime, data: impl Into<Bytes>) -> Self {
        Self::Encoded {
            mime,
            data: data.into(),
        }
    }

    /// Creates an image reference from a base64 payload, as pasted by a
    /// browser.
    ///
    /// A full `data:image/...;base64,` URI is kept as is. A bare base64
    /// payload without the prefix is assumed to be PNG.
    pub fn from_data_uri(input: &str) -> Result<Self, InvalidImageError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(InvalidImageError("empty payload".to_owned()));
        }

        let Some(rest) = input.strip_prefix("data:") else {
            // Validate the payload before wrapping it.
            STANDARD
                .decode(input)
                .map_err(|err| InvalidImageError(format!("{err}")))?;
            return Ok(Self::Url(format!("data:image/png;base64,{input}")));
        };

        let Some((media_type, payload)) = rest.split_once(',') else {
            return Err(InvalidImageError("missing data separator".to_owned()));
        };
        let Some(media_type) = media_type.strip_suffix(";base64") else {
            return Err(InvalidImageError(
                "only base64 data URIs are supported".to_owned(),
            ));
        };
        let mime: Mime = media_type
            .parse()
            .map_err(|_| InvalidImageError(format!("bad media type {media_type:?}")))?;
        if mime.type_() != mime::IMAGE {
            return Err(InvalidImageError(format!("{mime} is not an image")));
        }
        if payload.is_empty() {
            return Err(InvalidImageError("empty payload".to_owned()));
        }

        Ok(Self::Url(input.to_owned()))
    }

    /// Returns the URL to put on the wire. Encoded bytes become a base64
    /// `data:` URI.
    pub fn to_url(&self) -> String {
        match self {
            ImageRef::Url(url) => url.clone(),
            ImageRef::Encoded { mime, data } => {
                format!(
                    "data:{};base64,{}",
                    mime.essence_str(),
                    STANDARD.encode(data)
                )
            }
        }
    }
}

impl Debug for ImageRef {
    // Image payloads are huge, never dump them into logs.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Url(url) => {
                let head: String = url.chars().take(32).collect();
                f.debug_tuple("Url").field(&head).finish_non_exhaustive()
            }
            ImageRef::Encoded { mime, data } => f
                .debug_struct("Encoded")
                .field("mime", mime)
                .field("len", &data.len())
                .finish(),
        }
    }
}
