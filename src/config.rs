//! Application configuration
//!
//! Everything deployment-specific lives here as data: indicator word lists,
//! score thresholds, the affirmative-reply vocabulary, retry bounds, model
//! identifiers, acknowledgment pools and user-facing texts. Values come from
//! an optional TOML file, then environment overrides.

use crate::conversation::PromptPolicy;
use crate::detection::ScoreThresholds;
use crate::invoker::RetryPolicy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the TOML config file
pub const CONFIG_PATH_ENV: &str = "CONSULT_CHAT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid deep-exploration pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub models: ModelsConfig,
    pub detection: DetectionConfig,
    pub confirmation: ConfirmationConfig,
    pub retry: RetryConfig,
    pub acknowledgments: AcknowledgmentConfig,
    pub messages: MessagesConfig,
}

impl AppConfig {
    /// Load from the file named by `CONSULT_CHAT_CONFIG` (if set), then apply
    /// environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match path {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("CONSULT_CHAT_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(key) = lookup("LLM_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("LLM_BASE_URL").filter(|u| !u.is_empty()) {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("DEFAULT_MODEL").filter(|m| !m.is_empty()) {
            self.models.default_model = model;
        }
        if let Some(model) = lookup("DEEP_MODEL").filter(|m| !m.is_empty()) {
            self.models.deep_model = model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.to_policy()?;
        if self.models.default_model.trim().is_empty() || self.models.deep_model.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "model identifiers must not be empty".to_string(),
            ));
        }
        if self.server.session_prune_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.session_prune_interval_secs must be positive".to_string(),
            ));
        }
        if self.detection.scorer_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "detection.scorer_timeout_ms must be positive".to_string(),
            ));
        }
        if self.confirmation.affirmative_tokens.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one affirmative token is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// How often sessions holding only a fresh state are dropped
    pub session_prune_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            session_prune_interval_secs: 300,
        }
    }
}

impl ServerConfig {
    pub fn session_prune_interval(&self) -> Duration {
        Duration::from_secs(self.session_prune_interval_secs)
    }
}

/// Remote completion endpoint
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.perplexity.ai/chat/completions".to_string(),
            max_tokens: Some(1024),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub default_model: String,
    pub deep_model: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default_model: "mixtral-8x7b-instruct".to_string(),
            deep_model: "o1-preview-2024-09-12".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Indicators checked for every message
    pub indicators: Vec<String>,
    /// Indicators checked only when the caller supplies the matching context
    pub context_indicators: BTreeMap<String, Vec<String>>,
    /// Substrings requesting deeper exploration
    pub deep_indicators: Vec<String>,
    /// Case-insensitive regular expressions requesting deeper exploration
    pub deep_patterns: Vec<String>,
    pub thresholds: ScoreThresholds,
    /// A scorer that has not answered within this is treated as unavailable
    pub scorer_timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            indicators: strings(&[
                "error",
                "issue",
                "problem",
                "stuck",
                "help",
                "wrong",
                "not working",
                "failed",
                "trouble",
                "debug",
            ]),
            context_indicators: BTreeMap::from([
                (
                    "humanRelationship".to_string(),
                    strings(&[
                        "conflict",
                        "divorce",
                        "separation",
                        "abuse",
                        "trust issues",
                        "communication problems",
                    ]),
                ),
                (
                    "career.characteristic".to_string(),
                    strings(&[
                        "burnout",
                        "career change",
                        "workplace conflict",
                        "promotion decision",
                        "leadership challenges",
                    ]),
                ),
            ]),
            deep_indicators: strings(&[
                "deeper",
                "さらにわか",
                "もっと深",
                "a request for a deeper exploration",
                "tell me more",
                "elaborate",
                "explain further",
                "より詳しく",
                "detail",
            ]),
            deep_patterns: Vec::new(),
            thresholds: ScoreThresholds::default(),
            scorer_timeout_ms: 2000,
        }
    }
}

impl DetectionConfig {
    pub fn scorer_timeout(&self) -> Duration {
        Duration::from_millis(self.scorer_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub affirmative_tokens: Vec<String>,
    pub policy: PromptPolicy,
    /// Pending confirmations older than this are dropped on the next message
    pub pending_timeout_secs: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            affirmative_tokens: strings(&["yes", "y", "sure", "okay", "ok", "はい", "ええ", "うん"]),
            policy: PromptPolicy::default(),
            pending_timeout_secs: 600,
        }
    }
}

impl ConfirmationConfig {
    pub fn pending_timeout(&self) -> Duration {
        Duration::from_secs(self.pending_timeout_secs)
    }
}

/// Retry bounds, in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub multiplier_secs: f64,
    pub exponential_base: f64,
    pub floor_secs: f64,
    pub ceiling_secs: f64,
    pub per_attempt_timeout_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier_secs: 1.0,
            exponential_base: 2.0,
            floor_secs: 4.0,
            ceiling_secs: 10.0,
            per_attempt_timeout_secs: 25.0,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> Result<RetryPolicy, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be >= 1".into()));
        }
        if !(self.exponential_base.is_finite() && self.exponential_base >= 1.0) {
            return Err(ConfigError::Invalid(
                "retry.exponential_base must be >= 1".into(),
            ));
        }
        let floor = seconds("retry.floor_secs", self.floor_secs)?;
        let ceiling = seconds("retry.ceiling_secs", self.ceiling_secs)?;
        if floor > ceiling {
            return Err(ConfigError::Invalid(
                "retry.floor_secs must not exceed retry.ceiling_secs".into(),
            ));
        }
        let per_attempt_timeout =
            seconds("retry.per_attempt_timeout_secs", self.per_attempt_timeout_secs)?;
        if per_attempt_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "retry.per_attempt_timeout_secs must be positive".into(),
            ));
        }

        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            multiplier: seconds("retry.multiplier_secs", self.multiplier_secs)?,
            exponential_base: self.exponential_base,
            floor,
            ceiling,
            per_attempt_timeout,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcknowledgmentConfig {
    /// Candidate messages keyed by topic tag
    pub pools: BTreeMap<String, Vec<String>>,
    /// Sent instead of a pool pick when several topics are recognized
    pub combined: String,
}

impl Default for AcknowledgmentConfig {
    fn default() -> Self {
        Self {
            pools: BTreeMap::from([
                (
                    "career".to_string(),
                    strings(&[
                        "キャリアパスと職業目標を分析中です...",
                        "職務経験とスキルを処理中です...",
                        "キャリア機会と可能性のある方向性を評価中です...",
                        "あなたの状況に関連する業界動向を調査中です...",
                    ]),
                ),
                (
                    "characteristic".to_string(),
                    strings(&[
                        "性格特性と行動パターンを分析中です...",
                        "コミュニケーションスタイルと好みを処理中です...",
                        "対人関係のダイナミクスを評価中です...",
                        "あなたの強みと成長分野を確認中です...",
                    ]),
                ),
            ]),
            combined: "Analyzing both career and personal characteristics...\n\
                       This comprehensive analysis may take a few moments."
                .to_string(),
        }
    }
}

/// User-facing texts emitted by the mode controller
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub confirmation_prompt: String,
    pub activation_notice: String,
    pub deactivation_notice: String,
    pub fallback: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            confirmation_prompt: "It sounds like a more systematic consultation approach could \
                help here. Would you like me to switch to consultation mode? In this mode I will:\n\
                - ask more detailed questions to understand your situation\n\
                - analyze it systematically\n\
                - guide you step by step\n\n\
                Shall I continue? (Please respond with 'yes' or 'no')"
                .to_string(),
            activation_notice: "Switching to consultation mode. Let me analyze your problem."
                .to_string(),
            deactivation_notice: "Returning to standard conversation mode.".to_string(),
            fallback: "Sorry, something went wrong while preparing your answer. \
                Please try again in a little while."
                .to_string(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn seconds(field: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| ConfigError::Invalid(format!("{field} must be a non-negative number")))
}
