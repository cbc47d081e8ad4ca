//! Runtime configuration (spec §4.2, §4.3 defaults) — default policy
//! caps, activity timeouts, and retry options, loadable from TOML.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub policy: PolicyDefaults,
    #[serde(default)]
    pub plan_activity: ActivityRetryConfig,
    #[serde(default)]
    pub tool_activity: ActivityRetryConfig,
}

/// Default `CapsState` seed values applied when an `AgentRegistration`'s
/// `Policy` does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_calls: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_consecutive_failed_tool_calls: Option<u32>,
    /// Zero means unbounded (spec §4.2 step 1 "if TimeBudget > 0").
    #[serde(default)]
    pub time_budget_secs: u64,
    #[serde(default = "d_default_tool_timeout_secs")]
    pub default_tool_timeout_secs: u64,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            max_tool_calls: None,
            max_consecutive_failed_tool_calls: None,
            time_budget_secs: 0,
            default_tool_timeout_secs: d_default_tool_timeout_secs(),
        }
    }
}

impl PolicyDefaults {
    pub fn default_tool_timeout(&self) -> Duration {
        Duration::from_secs(self.default_tool_timeout_secs)
    }

    pub fn time_budget(&self) -> Option<Duration> {
        if self.time_budget_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.time_budget_secs))
        }
    }
}

/// Bounded retry policy for one activity kind (spec §4.2 step 2: "default:
/// 3 attempts, 1s initial backoff, x2" with a per-activity timeout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRetryConfig {
    #[serde(default = "d_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "d_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "d_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "d_activity_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ActivityRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: d_max_attempts(),
            initial_backoff_ms: d_initial_backoff_ms(),
            backoff_multiplier: d_backoff_multiplier(),
            timeout_secs: d_activity_timeout_secs(),
        }
    }
}

impl ActivityRetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff delay before attempt `attempt` (1-indexed retries, so
    /// `attempt=1` is the delay before the second try).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let ms = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32 - 1);
        Duration::from_millis(ms.round() as u64)
    }
}

fn d_default_tool_timeout_secs() -> u64 {
    30
}

fn d_max_attempts() -> u32 {
    3
}

fn d_initial_backoff_ms() -> u64 {
    1_000
}

fn d_backoff_multiplier() -> f64 {
    2.0
}

fn d_activity_timeout_secs() -> u64 {
    120
}

impl RuntimeConfig {
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_every_default() {
        let cfg = RuntimeConfig::from_toml("").unwrap();
        assert_eq!(cfg.plan_activity.max_attempts, 3);
        assert_eq!(cfg.tool_activity.timeout_secs, 120);
        assert_eq!(cfg.policy.default_tool_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.policy.time_budget(), None);
    }

    #[test]
    fn backoff_doubles_each_attempt() {
        let retry = ActivityRetryConfig::default();
        assert_eq!(retry.backoff_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(retry.backoff_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(retry.backoff_for_attempt(3), Duration::from_millis(4000));
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = RuntimeConfig::from_toml(
            r#"
            [policy]
            max_tool_calls = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.policy.max_tool_calls, Some(10));
        assert_eq!(cfg.policy.default_tool_timeout_secs, 30);
    }
}
