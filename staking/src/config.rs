//! Staking ledger configuration with TOML file support.

use serde::{Deserialize, Serialize};
use tally_types::AccountId;

use crate::average::HistoryAnchor;
use crate::rewards::RemainderPolicy;
use crate::StakingError;

/// Configuration for a staking ledger.
///
/// `rolling_window_secs` and `min_stake` only seed a fresh store; once
/// persisted, the stored values (changed through admin operations) win.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Identity allowed to call admin-only operations.
    #[serde(default = "default_admin")]
    pub admin: AccountId,

    /// Account holding staked principal and reward deposits.
    #[serde(default = "default_custody")]
    pub custody: AccountId,

    /// Maturity period and averaging window, in seconds.
    #[serde(default = "default_rolling_window")]
    pub rolling_window_secs: u64,

    /// Minimum balance before the maturity clock starts. TOML integers
    /// are 64-bit; larger thresholds are set through the admin operation.
    #[serde(default = "default_min_stake")]
    pub min_stake: u64,

    #[serde(default)]
    pub history_anchor: HistoryAnchor,

    #[serde(default)]
    pub remainder_policy: RemainderPolicy,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Checkpoint compaction settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default)]
    pub enabled: bool,
    /// History kept behind `now`. Never less than one rolling window.
    #[serde(default = "default_keep_secs")]
    pub keep_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "human" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Filter directive: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_admin() -> AccountId {
    AccountId::new("admin")
}

fn default_custody() -> AccountId {
    AccountId::new("custody")
}

fn default_rolling_window() -> u64 {
    86_400
}

fn default_min_stake() -> u64 {
    500
}

fn default_keep_secs() -> u64 {
    30 * 86_400
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl StakingConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, StakingError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StakingError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, StakingError> {
        let config: Self = toml::from_str(s).map_err(|e| StakingError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, StakingError> {
        toml::to_string_pretty(self).map_err(|e| StakingError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), StakingError> {
        if self.rolling_window_secs == 0 {
            return Err(StakingError::InvalidConfig("rolling_window_secs must be positive".into()));
        }
        if self.admin == self.custody {
            return Err(StakingError::InvalidConfig(
                "admin and custody must be distinct accounts".into(),
            ));
        }
        Ok(())
    }

    /// How far back checkpoints must be kept at `rolling_window_secs`.
    pub fn retention_horizon_secs(&self, rolling_window_secs: u64) -> u64 {
        self.retention.keep_secs.max(rolling_window_secs)
    }
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            custody: default_custody(),
            rolling_window_secs: default_rolling_window(),
            min_stake: default_min_stake(),
            history_anchor: HistoryAnchor::default(),
            remainder_policy: RemainderPolicy::default(),
            retention: RetentionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            keep_secs: default_keep_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = StakingConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = StakingConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = StakingConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.rolling_window_secs, 86_400);
        assert_eq!(config.min_stake, 500);
        assert_eq!(config.history_anchor, HistoryAnchor::FirstCheckpoint);
        assert_eq!(config.remainder_policy, RemainderPolicy::RollForward);
        assert!(!config.retention.enabled);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            admin = "ops"
            rolling_window_secs = 3600
            history_anchor = "first_in_window"
            remainder_policy = "retire"

            [retention]
            enabled = true
            keep_secs = 60
        "#;
        let config = StakingConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.admin, AccountId::new("ops"));
        assert_eq!(config.rolling_window_secs, 3_600);
        assert_eq!(config.history_anchor, HistoryAnchor::FirstInWindow);
        assert_eq!(config.remainder_policy, RemainderPolicy::Retire);
        assert!(config.retention.enabled);
        // keep_secs below the window is stretched to the window.
        assert_eq!(config.retention_horizon_secs(config.rolling_window_secs), 3_600);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = StakingConfig::from_toml_str("rolling_window_secs = 0").unwrap_err();
        assert!(matches!(err, StakingError::InvalidConfig(_)));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = StakingConfig::from_toml_file(std::path::Path::new("/nonexistent/tally.toml"));
        assert!(matches!(result, Err(StakingError::InvalidConfig(_))));
    }
}
