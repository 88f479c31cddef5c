//! Configuration management for itemrag
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.itemrag/config.toml

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{RagError, Result};

/// Environment variables that override endpoint URLs after loading
const ENV_OPTIMIZER_URL: &str = "ITEMRAG_OPTIMIZER_URL";
const ENV_ANSWER_URL: &str = "ITEMRAG_ANSWER_URL";
const ENV_STORE_URL: &str = "ITEMRAG_STORE_URL";

/// Allowed entries per context tier
const TIER_A_CAP_RANGE: RangeInclusive<usize> = 2..=3;
const TIER_B_CAP_RANGE: RangeInclusive<usize> = 2..=3;
const TIER_C_CAP_RANGE: RangeInclusive<usize> = 1..=2;

/// Complete configuration for the pipeline and its collaborators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoints: EndpointsConfig,
    pub timeouts: TimeoutsConfig,
    pub retrieval: RetrievalConfig,
    pub fusion: FusionConfig,
    pub context: ContextConfig,
    pub logging: LoggingConfig,
}

/// External service endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub optimizer_url: String,
    pub answer_url: String,
    pub store_url: String,
    /// Name of the environment variable holding a bearer token, if any
    pub api_key_env: Option<String>,
}

/// Per-call timeouts in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub optimizer_ms: u64,
    pub retrieval_ms: u64,
    pub answer_ms: u64,
}

/// Hybrid search profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchProfile {
    /// Maximum number of hits requested from the store
    pub limit: usize,
    /// Vector/keyword balance (0.0 = pure keyword, 1.0 = pure vector)
    pub alpha: f64,
}

/// Retriever settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub semantic: SearchProfile,
    pub keyword: SearchProfile,
}

/// Fusion weights and output size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub semantic_weight: f64,
    pub bm25_weight: f64,
    pub tag_weight: f64,
    pub same_item_weight: f64,
    /// Number of fused results kept
    pub top_n: usize,
}

/// Context assembly settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub tier_a_cap: usize,
    pub tier_b_cap: usize,
    pub tier_c_cap: usize,
    /// Same-item results scoring above this land in tier A, the rest in tier B
    pub tier_a_threshold: f64,
    pub max_excerpt_chars: usize,
}

/// Logging settings for the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

/// Upper bound on fused results handed to the context assembler
pub const MAX_FUSED_RESULTS: usize = 6;

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            optimizer_url: "http://127.0.0.1:8100/agents/question-optimizer".to_string(),
            answer_url: "http://127.0.0.1:8100/agents/answer".to_string(),
            store_url: "http://127.0.0.1:8080/v1/hybrid-search".to_string(),
            api_key_env: None,
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            optimizer_ms: 15_000,
            retrieval_ms: 10_000,
            answer_ms: 60_000,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            semantic: SearchProfile {
                limit: 24,
                alpha: 0.6,
            },
            keyword: SearchProfile {
                limit: 20,
                alpha: 0.7,
            },
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.60,
            bm25_weight: 0.20,
            tag_weight: 0.15,
            same_item_weight: 0.05,
            top_n: MAX_FUSED_RESULTS,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            tier_a_cap: 3,
            tier_b_cap: 3,
            tier_c_cap: 2,
            tier_a_threshold: 0.5,
            max_excerpt_chars: 1200,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TimeoutsConfig {
    pub fn optimizer(&self) -> Duration {
        Duration::from_millis(self.optimizer_ms)
    }

    pub fn retrieval(&self) -> Duration {
        Duration::from_millis(self.retrieval_ms)
    }

    pub fn answer(&self) -> Duration {
        Duration::from_millis(self.answer_ms)
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(config_path) => Self::load_from_file(&config_path)?,
            None => Self::load_default()?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RagError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| RagError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".itemrag").join("config.toml"))
    }

    /// Override endpoint URLs from the environment
    pub fn apply_env_overrides(&mut self) {
        let overrides = [
            (ENV_OPTIMIZER_URL, &mut self.endpoints.optimizer_url),
            (ENV_ANSWER_URL, &mut self.endpoints.answer_url),
            (ENV_STORE_URL, &mut self.endpoints.store_url),
        ];

        for (key, target) in overrides {
            if let Ok(value) = std::env::var(key) {
                tracing::debug!("Applying env override {}", key);
                *target = value;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("optimizer_url", &self.endpoints.optimizer_url),
            ("answer_url", &self.endpoints.answer_url),
            ("store_url", &self.endpoints.store_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(RagError::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        if self.timeouts.optimizer_ms == 0
            || self.timeouts.retrieval_ms == 0
            || self.timeouts.answer_ms == 0
        {
            return Err(RagError::Config(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        for (name, profile) in [
            ("semantic", &self.retrieval.semantic),
            ("keyword", &self.retrieval.keyword),
        ] {
            if profile.limit == 0 {
                return Err(RagError::Config(format!(
                    "retrieval.{}.limit must be greater than 0",
                    name
                )));
            }
            if !(0.0..=1.0).contains(&profile.alpha) {
                return Err(RagError::Config(format!(
                    "retrieval.{}.alpha must be between 0.0 and 1.0",
                    name
                )));
            }
        }

        let weights = [
            self.fusion.semantic_weight,
            self.fusion.bm25_weight,
            self.fusion.tag_weight,
            self.fusion.same_item_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RagError::Config(
                "fusion weights must be non-negative".to_string(),
            ));
        }
        if weights.iter().all(|w| *w == 0.0) {
            return Err(RagError::Config(
                "at least one fusion weight must be positive".to_string(),
            ));
        }

        if self.fusion.top_n == 0 || self.fusion.top_n > MAX_FUSED_RESULTS {
            return Err(RagError::Config(format!(
                "fusion.top_n must be between 1 and {}",
                MAX_FUSED_RESULTS
            )));
        }

        for (name, cap, bounds) in [
            ("tier_a_cap", self.context.tier_a_cap, TIER_A_CAP_RANGE),
            ("tier_b_cap", self.context.tier_b_cap, TIER_B_CAP_RANGE),
            ("tier_c_cap", self.context.tier_c_cap, TIER_C_CAP_RANGE),
        ] {
            if !bounds.contains(&cap) {
                return Err(RagError::Config(format!(
                    "context.{} must be between {} and {}, got {}",
                    name,
                    bounds.start(),
                    bounds.end(),
                    cap
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.context.tier_a_threshold) {
            return Err(RagError::Config(
                "tier_a_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.context.max_excerpt_chars == 0 {
            return Err(RagError::Config(
                "max_excerpt_chars must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(RagError::Config(format!(
                    "Invalid log level: {}",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RagError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RagError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| RagError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Bearer token for the external services, read from the configured variable
    pub fn api_key(&self) -> Option<String> {
        self.endpoints
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.is_empty())
    }
}
