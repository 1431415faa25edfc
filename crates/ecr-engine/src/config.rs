//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::action::ActionDefinition;
use crate::value_set::{DEFAULT_VALUE_SET_ID, DEFAULT_VALUE_SET_VERSION};

/// How `triggerMatchStatus` is derived across several trigger paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// The last path that produced codes decides the flag.
    #[default]
    LastWriteWins,
    /// The flag is set if any path matched.
    AnyMatch,
}

/// Configuration for the trigger engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub match_policy: MatchPolicy,

    #[serde(default)]
    pub value_set: ValueSetConfig,

    /// Workflow actions, run in order
    #[serde(default = "default_actions")]
    pub actions: Vec<ActionDefinition>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::default(),
            value_set: ValueSetConfig::default(),
            actions: default_actions(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.value_set.id.trim().is_empty() {
            return Err("value_set.id must not be empty".into());
        }
        let mut seen = std::collections::HashSet::new();
        for action in &self.actions {
            if action.id.trim().is_empty() {
                return Err("actions[].id must not be empty".into());
            }
            if !seen.insert(action.id.as_str()) {
                return Err(format!("duplicate action id: {}", action.id));
            }
        }
        Ok(())
    }
}

/// Where the reportable value set comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSetConfig {
    /// Identifier recorded with every match
    #[serde(default = "default_value_set_id")]
    pub id: String,

    /// Version recorded with every match
    #[serde(default = "default_value_set_version")]
    pub version: String,

    /// FHIR ValueSet JSON file
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Inline codes, used when no file is configured
    #[serde(default)]
    pub codes: Vec<String>,
}

impl Default for ValueSetConfig {
    fn default() -> Self {
        Self {
            id: default_value_set_id(),
            version: default_value_set_version(),
            path: None,
            codes: Vec::new(),
        }
    }
}

fn default_value_set_id() -> String {
    DEFAULT_VALUE_SET_ID.to_string()
}

fn default_value_set_version() -> String {
    DEFAULT_VALUE_SET_VERSION.to_string()
}

fn default_actions() -> Vec<ActionDefinition> {
    vec![ActionDefinition::match_trigger(
        "match-trigger",
        ["Condition.code", "Observation.code", "Observation.value"],
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let cfg: EngineConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(cfg.match_policy, MatchPolicy::LastWriteWins);
        assert_eq!(cfg.value_set.id, DEFAULT_VALUE_SET_ID);
        assert_eq!(cfg.value_set.version, "1");
        assert_eq!(cfg.actions.len(), 1);
        assert_eq!(cfg.actions[0].trigger_data.len(), 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_match_policy_names() {
        let cfg: EngineConfig =
            serde_json::from_value(json!({"match_policy": "any-match", "actions": []})).unwrap();
        assert_eq!(cfg.match_policy, MatchPolicy::AnyMatch);
        assert!(cfg.actions.is_empty());
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let mut cfg = EngineConfig::default();
        cfg.actions.push(cfg.actions[0].clone());
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("duplicate action id"));
    }

    #[test]
    fn test_validate_rejects_blank_value_set() {
        let mut cfg = EngineConfig::default();
        cfg.value_set.id = " ".into();
        assert!(cfg.validate().is_err());
    }
}
