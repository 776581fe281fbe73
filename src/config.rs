use std::time::Duration;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "Inside Imaging";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,inside_imaging=debug"
}

/// Environment variable naming the glossary CSV used by the CLI.
pub const GLOSSARY_ENV: &str = "INSIDEIMAGING_GLOSSARY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-5";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Upper bound on self-consistency attempts per report.
pub const MAX_SELF_CONSISTENCY: usize = 5;

/// Reasoning effort passed through to models that accept it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "minimal" => Some(Self::Minimal),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Settings for the optional language-model summary provider.
///
/// Built once by the host. Without an API key the provider is never attempted
/// and every report goes through the deterministic fallback.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub primary_model: String,
    /// Chat-capable model retried once when the primary model is rejected.
    pub fallback_model: Option<String>,
    pub max_output_tokens: u32,
    /// Minimum wall-clock time for a summary call. UX pacing only.
    pub min_think: Duration,
    pub self_consistency: usize,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub timeout: Duration,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            primary_model: DEFAULT_MODEL.to_string(),
            fallback_model: None,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            min_think: Duration::ZERO,
            self_consistency: 1,
            reasoning_effort: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SummaryConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let primary_model = get("OPENAI_MODEL").unwrap_or(defaults.primary_model);
        // A fallback identical to the primary model would just repeat the failure.
        let fallback_model = get("OPENAI_FALLBACK_MODEL").filter(|m| *m != primary_model);

        let reasoning_effort = get("OPENAI_REASONING_EFFORT").and_then(|v| {
            let parsed = ReasoningEffort::parse(&v);
            if parsed.is_none() {
                tracing::warn!(value = %v, "Unknown OPENAI_REASONING_EFFORT, ignoring");
            }
            parsed
        });

        let self_consistency = parse_or(
            "OPENAI_SELF_CONSISTENCY",
            get("OPENAI_SELF_CONSISTENCY"),
            defaults.self_consistency,
        )
        .clamp(1, MAX_SELF_CONSISTENCY);

        let min_think_secs = parse_or("OPENAI_THINK_MIN", get("OPENAI_THINK_MIN"), 0.0_f64);
        let timeout_secs = parse_or("OPENAI_TIMEOUT", get("OPENAI_TIMEOUT"), DEFAULT_TIMEOUT_SECS);

        Self {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            primary_model,
            fallback_model,
            max_output_tokens: parse_or(
                "OPENAI_MAX_OUTPUT_TOKENS",
                get("OPENAI_MAX_OUTPUT_TOKENS"),
                defaults.max_output_tokens,
            ),
            min_think: Duration::try_from_secs_f64(min_think_secs.max(0.0)).unwrap_or_default(),
            self_consistency,
            reasoning_effort,
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    /// Whether a credential is configured. Gates the provider entirely.
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Parse a numeric setting, logging and falling back to `default` when malformed.
fn parse_or<T: std::str::FromStr + Copy>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        None => default,
        Some(setting) => setting.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %setting, "Malformed numeric setting, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = SummaryConfig::from_lookup(|_| None);
        assert!(!config.has_credential());
        assert_eq!(config.primary_model, "gpt-5");
        assert_eq!(config.fallback_model, None);
        assert_eq!(config.self_consistency, 1);
        assert_eq!(config.min_think, Duration::ZERO);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn reads_all_recognized_options() {
        let config = SummaryConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-5-mini"),
            ("OPENAI_FALLBACK_MODEL", "gpt-4o"),
            ("OPENAI_MAX_OUTPUT_TOKENS", "900"),
            ("OPENAI_THINK_MIN", "1.5"),
            ("OPENAI_SELF_CONSISTENCY", "3"),
            ("OPENAI_REASONING_EFFORT", "High"),
            ("OPENAI_TIMEOUT", "20"),
        ]));
        assert!(config.has_credential());
        assert_eq!(config.primary_model, "gpt-5-mini");
        assert_eq!(config.fallback_model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.max_output_tokens, 900);
        assert_eq!(config.min_think, Duration::from_millis(1500));
        assert_eq!(config.self_consistency, 3);
        assert_eq!(config.reasoning_effort, Some(ReasoningEffort::High));
        assert_eq!(config.timeout, Duration::from_secs(20));
    }

    #[test]
    fn blank_api_key_is_no_credential() {
        let config = SummaryConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")]));
        assert!(!config.has_credential());
    }

    #[test]
    fn fallback_equal_to_primary_is_dropped() {
        let config = SummaryConfig::from_lookup(lookup(&[
            ("OPENAI_MODEL", "gpt-4o"),
            ("OPENAI_FALLBACK_MODEL", "gpt-4o"),
        ]));
        assert_eq!(config.fallback_model, None);
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let config = SummaryConfig::from_lookup(lookup(&[
            ("OPENAI_MAX_OUTPUT_TOKENS", "lots"),
            ("OPENAI_SELF_CONSISTENCY", "-2"),
            ("OPENAI_REASONING_EFFORT", "extreme"),
        ]));
        assert_eq!(config.max_output_tokens, 2048);
        assert_eq!(config.self_consistency, 1);
        assert_eq!(config.reasoning_effort, None);
    }

    #[test]
    fn self_consistency_is_clamped() {
        let config = SummaryConfig::from_lookup(lookup(&[("OPENAI_SELF_CONSISTENCY", "50")]));
        assert_eq!(config.self_consistency, MAX_SELF_CONSISTENCY);
    }

    #[test]
    fn app_name_is_inside_imaging() {
        assert_eq!(APP_NAME, "Inside Imaging");
    }
}
