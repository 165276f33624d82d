//! Per-model capabilities.
//!
//! Which parameters a model accepts is data, not code: adding a model id
//! means adding a row to [`ModelProfiles`].

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::{Arc, LazyLock};

use plainchat_model::TokenLimitParam::{self, MaxCompletionTokens, MaxTokens};

/// Capabilities of one model id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelProfile {
    /// Whether the model accepts a sampling temperature. Some models
    /// reject the request when it is present at all.
    pub supports_temperature: bool,
    /// Whether the model accepts image content parts.
    pub supports_vision: bool,
    /// The parameter used to cap the output length.
    pub token_limit: TokenLimitParam,
}

impl ModelProfile {
    /// The conservative profile used for unknown model ids.
    pub const FALLBACK: ModelProfile = ModelProfile {
        supports_temperature: false,
        supports_vision: false,
        token_limit: TokenLimitParam::MaxTokens,
    };

    const fn new(
        supports_temperature: bool,
        supports_vision: bool,
        token_limit: TokenLimitParam,
    ) -> Self {
        Self {
            supports_temperature,
            supports_vision,
            token_limit,
        }
    }
}

const BUILTIN_PROFILES: &[(&str, ModelProfile)] = &[
    ("gpt-5-mini", ModelProfile::new(false, false, MaxCompletionTokens)),
    ("gpt-5", ModelProfile::new(false, true, MaxCompletionTokens)),
    ("gpt-4o", ModelProfile::new(true, true, MaxCompletionTokens)),
    ("gpt-4o-mini", ModelProfile::new(true, true, MaxTokens)),
    ("gpt-4-turbo", ModelProfile::new(true, true, MaxTokens)),
    ("gpt-3.5-turbo", ModelProfile::new(true, false, MaxTokens)),
];

static BUILTIN: LazyLock<Arc<ModelProfiles>> =
    LazyLock::new(|| Arc::new(ModelProfiles::from_entries(BUILTIN_PROFILES)));

/// The model id has no entry in the profile table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownModelError {
    model: String,
}

impl UnknownModelError {
    /// The model id that was looked up.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Display for UnknownModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no profile for model {:?}", self.model)
    }
}

impl std::error::Error for UnknownModelError {}

/// A lookup table from model id to [`ModelProfile`].
///
/// The table is filled once and only read afterwards, so it can be shared
/// freely between concurrent requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelProfiles {
    profiles: HashMap<String, ModelProfile>,
    fallback: ModelProfile,
}

impl ModelProfiles {
    /// Returns the built-in table, initialised on first use.
    #[inline]
    pub fn builtin() -> Arc<ModelProfiles> {
        Arc::clone(&BUILTIN)
    }

    /// Creates an empty table with the default fallback profile.
    #[inline]
    pub fn empty() -> Self {
        Self {
            profiles: HashMap::new(),
            fallback: ModelProfile::FALLBACK,
        }
    }

    fn from_entries(entries: &[(&str, ModelProfile)]) -> Self {
        let mut table = Self::empty();
        for (id, profile) in entries {
            table.profiles.insert((*id).to_owned(), *profile);
        }
        table
    }

    /// Adds or replaces the profile of a model id.
    #[inline]
    pub fn with<S: Into<String>>(mut self, model: S, profile: ModelProfile) -> Self {
        self.profiles.insert(model.into(), profile);
        self
    }

    /// Replaces the profile used for unknown model ids.
    #[inline]
    pub fn with_fallback(mut self, profile: ModelProfile) -> Self {
        self.fallback = profile;
        self
    }

    /// Looks up the profile of a model id.
    pub fn get(&self, model: &str) -> Result<&ModelProfile, UnknownModelError> {
        self.profiles.get(model).ok_or_else(|| UnknownModelError {
            model: model.to_owned(),
        })
    }

    /// The profile used for unknown model ids.
    #[inline]
    pub fn fallback(&self) -> ModelProfile {
        self.fallback
    }

    /// Iterates over the known model ids, in no particular order.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

impl Default for ModelProfiles {
    #[inline]
    fn default() -> Self {
        Self::from_entries(BUILTIN_PROFILES)
    }
}
