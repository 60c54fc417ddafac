//! Moderation configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with MODWATCH_)
//! 2. Config file (moderation.toml)
//! 3. Default values
//!
//! Raw values are kept as strings and parsed tolerantly through the accessor
//! methods; a typo in an operator-edited file must never take the evaluation
//! pipeline down.

use crate::moderation::rules::RuleKind;
use crate::orm::moderation_signals::Severity;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Auto-hide policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Master switch for automated hiding
    pub auto_hide_enabled: bool,
    /// Service account user id performing automated hides
    /// (should be in env var MODWATCH_AUTO_HIDE_ACTOR_ID)
    pub auto_hide_actor_id: String,
    /// Minimum severity tier eligible for automation: "low" through "critical"
    pub auto_hide_min_severity: String,
    /// Comma-separated rule names the automation may act on
    pub auto_hide_rules: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            auto_hide_enabled: true,
            auto_hide_actor_id: String::new(),
            auto_hide_min_severity: "critical".to_string(),
            auto_hide_rules: "spam,suspicious_link,mass_creation".to_string(),
        }
    }
}

/// Parsed auto-hide policy, resolved once per evaluation.
#[derive(Debug, Clone)]
pub struct AutoHidePolicy {
    pub enabled: bool,
    pub actor_id: Option<i32>,
    pub min_severity: Severity,
    pub rules: HashSet<RuleKind>,
}

impl ModerationConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("moderation.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&ModerationConfig::default())?)
            // Add config file (optional)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // Override with environment variables (MODWATCH_ prefix)
            // e.g., MODWATCH_AUTO_HIDE_ENABLED, MODWATCH_AUTO_HIDE_MIN_SEVERITY
            .add_source(Environment::with_prefix("MODWATCH").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    /// The configured service account, if one is set and plausible.
    pub fn actor_id(&self) -> Option<i32> {
        let raw = self.auto_hide_actor_id.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<i32>() {
            Ok(id) if id > 0 => Some(id),
            _ => {
                log::warn!("auto_hide_actor_id {:?} is not a positive user id", raw);
                None
            }
        }
    }

    /// The configured severity floor, falling back to critical on bad input.
    pub fn min_severity(&self) -> Severity {
        let raw = self.auto_hide_min_severity.trim().to_lowercase();
        match Severity::parse(&raw) {
            Some(severity) => severity,
            None => {
                log::warn!(
                    "auto_hide_min_severity {:?} is not a severity tier, using critical",
                    self.auto_hide_min_severity
                );
                Severity::Critical
            }
        }
    }

    /// Rule names the automation may act on. Unknown names are dropped.
    pub fn allowed_rules(&self) -> HashSet<RuleKind> {
        let mut rules = HashSet::new();
        for name in self.auto_hide_rules.split(',') {
            let name = name.trim().to_lowercase();
            if name.is_empty() {
                continue;
            }
            match RuleKind::parse(&name) {
                Some(rule) => {
                    rules.insert(rule);
                }
                None => log::warn!("auto_hide_rules contains unknown rule {:?}", name),
            }
        }
        rules
    }

    pub fn auto_hide_policy(&self) -> AutoHidePolicy {
        AutoHidePolicy {
            enabled: self.auto_hide_enabled,
            actor_id: self.actor_id(),
            min_severity: self.min_severity(),
            rules: self.allowed_rules(),
        }
    }
}
