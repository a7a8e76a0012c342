//! Engine configuration.

use serde::{Deserialize, Serialize};

/// How the model loader treats rules it cannot use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulePolicy {
    /// Log a warning and skip the rule.
    #[default]
    Lenient,
    /// Refuse to load the model.
    Strict,
}

/// Engine-wide settings.
///
/// Deserializes with every key optional:
///
/// ```
/// use formguard_validator::config::{EngineConfig, RulePolicy};
///
/// let config: EngineConfig = serde_json::from_str(r#"{"rule_policy": "strict"}"#).unwrap();
/// assert_eq!(config.rule_policy, RulePolicy::Strict);
/// assert!(config.log_late_results);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Treatment of unknown rules and malformed parameters.
    pub rule_policy: RulePolicy,
    /// Log async field results that settle after a fail-fast form verdict.
    pub log_late_results: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rule_policy: RulePolicy::Lenient,
            log_late_results: true,
        }
    }
}

impl EngineConfig {
    /// Sets the rule policy.
    pub fn with_rule_policy(mut self, policy: RulePolicy) -> Self {
        self.rule_policy = policy;
        self
    }

    /// Enables or disables late-result logging.
    pub fn with_late_result_logging(mut self, enabled: bool) -> Self {
        self.log_late_results = enabled;
        self
    }
}
