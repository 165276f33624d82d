//! Settings read from the environment.

use std::env;
use std::fmt::{self, Debug, Display};
use std::time::Duration;

use plainchat_core::{ChatService, ChatServiceBuilder, Error as CoreError};
use plainchat_openai_model::{OpenAIConfigBuilder, OpenAIProvider};

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MODEL: &str = "gpt-5-mini";

/// An environment variable holds a value that can't be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigError {
    var: &'static str,
    reason: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.var, self.reason)
    }
}

impl std::error::Error for ConfigError {}

/// Application settings.
///
/// The API key is optional at load time: a missing key is only an error
/// when a chat request actually needs it, so the web service can still
/// start and report its health.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// `OPENAI_BASE_URL`, the provider default when unset.
    pub base_url: Option<String>,
    /// `OPENAI_TIMEOUT_SECS`.
    pub timeout: Duration,
    /// `PLAINCHAT_DEFAULT_MODEL`, used when a request names no model.
    pub default_model: String,
}

impl AppConfig {
    /// Reads the settings from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the settings through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let timeout = match non_empty("OPENAI_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|err| ConfigError {
                    var: "OPENAI_TIMEOUT_SECS",
                    reason: format!("{raw:?}: {err}"),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_key: non_empty("OPENAI_API_KEY"),
            base_url: non_empty("OPENAI_BASE_URL"),
            timeout,
            default_model: non_empty("PLAINCHAT_DEFAULT_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        })
    }

    /// Whether a credential is available.
    #[inline]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Creates the chat service backed by the OpenAI provider.
    ///
    /// Fails with a configuration error when no credential is set.
    pub fn chat_service(&self) -> Result<ChatService, CoreError> {
        let Some(api_key) = &self.api_key else {
            return Err(CoreError::configuration("OPENAI_API_KEY is not set"));
        };

        let mut builder = OpenAIConfigBuilder::with_api_key(api_key.clone())
            .with_timeout(self.timeout);
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(base_url.clone());
        }
        let provider = OpenAIProvider::new(builder.build());
        Ok(ChatServiceBuilder::with_model_provider(provider).build())
    }
}

impl Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("default_model", &self.default_model)
            .finish()
    }
}
