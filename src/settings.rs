//! Process settings read once from the environment.
//!
//! Settings are loaded at startup (after `.env` has been applied) and passed
//! down explicitly. Nothing reads the environment mid-match.

use derive_getters::Getters;
use derive_more::{Display, Error};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// How long the engine waits for one AI decision.
pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenAI-compatible endpoint used when `OPENAI_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model used when `AI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Completion length cap used when `AI_MAX_TOKENS` is unset.
pub const DEFAULT_MAX_TOKENS: u32 = 64;

/// Which AI variant drives AI-controlled cities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum AiType {
    /// Seeded uniform choice over legal actions.
    #[default]
    #[display("random")]
    Random,
    /// Remote language model.
    #[display("llm")]
    Llm,
}

impl FromStr for AiType {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(AiType::Random),
            "llm" => Ok(AiType::Llm),
            other => Err(SettingsError::new(format!(
                "AI_TYPE must be 'random' or 'llm', got '{}'",
                other
            ))),
        }
    }
}

/// Language-model transport settings.
#[derive(Clone, PartialEq, Eq, Getters)]
pub struct LlmSettings {
    /// API key; `None` when `OPENAI_KEY` is unset or empty.
    api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    base_url: String,
    /// Model name.
    model: String,
    /// Completion length cap.
    max_tokens: u32,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl LlmSettings {
    /// Creates transport settings.
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            max_tokens,
        }
    }
}

/// Immutable process settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Settings {
    /// Selected AI variant.
    ai_type: AiType,
    /// Transport settings, consulted only for [`AiType::Llm`].
    llm: LlmSettings,
    /// Bound on every AI decision.
    decision_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ai_type: AiType::default(),
            llm: LlmSettings::default(),
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    #[instrument]
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let ai_type = match lookup("AI_TYPE") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => AiType::default(),
        };

        let mut llm = LlmSettings::default();
        if ai_type == AiType::Llm {
            llm.api_key = lookup("OPENAI_KEY").filter(|key| !key.trim().is_empty());
            if let Some(base_url) = lookup("OPENAI_BASE_URL").filter(|v| !v.trim().is_empty()) {
                llm.base_url = base_url.trim().trim_end_matches('/').to_string();
            }
            if let Some(model) = lookup("AI_MODEL").filter(|v| !v.trim().is_empty()) {
                llm.model = model.trim().to_string();
            }
            if let Some(max_tokens) = lookup("AI_MAX_TOKENS") {
                llm.max_tokens = max_tokens.trim().parse().map_err(|e| {
                    SettingsError::new(format!("Invalid AI_MAX_TOKENS '{}': {}", max_tokens, e))
                })?;
            }
            if llm.api_key.is_none() {
                warn!("AI_TYPE=llm but OPENAI_KEY is not set; every AI decision will fall back to EndTurn");
            }
        }

        let settings = Self {
            ai_type,
            llm,
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
        };
        info!(ai_type = %settings.ai_type, model = %settings.llm.model, "Settings loaded");
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }

    /// Replaces the decision timeout.
    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = timeout;
        self
    }
}

/// Settings error. Always fatal at startup.
#[derive(Debug, Clone, Display, Error)]
#[display("Settings error: {} at {}:{}", message, file, line)]
pub struct SettingsError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SettingsError {
    /// Creates a new settings error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
