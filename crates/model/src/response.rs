use serde::{Deserialize, Serialize};

/// A completed response from the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text, unprocessed.
    pub text: String,
    /// The model that produced the text, as reported by the service.
    pub model: String,
}
