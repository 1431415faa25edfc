//! The contract every workflow action implements, and its declarative
//! configuration.
//!
//! Actions are configured once (see [`ActionDefinition`]) and executed many
//! times against different launch contexts. Only the trigger data is used by
//! the match-trigger variant; preconditions, related actions and timing data
//! are part of the general contract for other workflow steps.

use async_trait::async_trait;
use ecr_core::{EcrResult, LaunchContext};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a configured workflow action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    /// Match patient codes against the reportable-condition value set
    MatchTrigger,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::MatchTrigger => "match-trigger",
        }
    }
}

/// Trigger data: where to pull candidate codes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionData {
    /// Code path expression, e.g. `Condition.code`
    pub path: String,
    /// Optional data type hint (`CodeableConcept`, `Coding`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl ActionData {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data_type: None,
        }
    }
}

/// Kind of a precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionKind {
    Applicability,
    Start,
    Stop,
}

/// An expression that gates whether an action applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub expression: String,
}

/// Reference to another action and how this one relates to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedAction {
    /// e.g. `before-start`, `after-end`
    pub relationship: String,
    pub related_action_id: String,
    /// ISO-8601 style offset, e.g. `PT6H`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

/// When an action runs relative to its trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSchedule {
    pub duration: u64,
    /// UCUM time unit: `s`, `min`, `h`, `d`
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
}

/// Configuration of one workflow action. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub trigger_data: Vec<ActionData>,
    #[serde(default)]
    pub preconditions: Vec<Condition>,
    #[serde(default)]
    pub related_actions: Vec<RelatedAction>,
    #[serde(default)]
    pub timing_data: Vec<TimingSchedule>,
}

impl ActionDefinition {
    /// Creates a match-trigger definition evaluating `paths` in order.
    pub fn match_trigger<I, S>(id: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            action_type: ActionType::MatchTrigger,
            trigger_data: paths.into_iter().map(ActionData::new).collect(),
            preconditions: Vec::new(),
            related_actions: Vec::new(),
            timing_data: Vec::new(),
        }
    }
}

impl fmt::Display for ActionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Action {} ({})", self.id, self.action_type.as_str())?;
        for condition in &self.preconditions {
            writeln!(f, "  precondition {:?}: {}", condition.kind, condition.expression)?;
        }
        for related in &self.related_actions {
            write!(f, "  related {} {}", related.relationship, related.related_action_id)?;
            match &related.offset {
                Some(offset) => writeln!(f, " offset {offset}")?,
                None => writeln!(f)?,
            }
        }
        for timing in &self.timing_data {
            writeln!(f, "  timing {}{}", timing.duration, timing.unit)?;
        }
        for data in &self.trigger_data {
            writeln!(f, "  trigger path {}", data.path)?;
        }
        Ok(())
    }
}

/// A workflow step that can be executed against a launch context.
///
/// Implementations must be re-entrant: the same action may run many times
/// against the same launch and must never short-circuit on a prior status.
#[async_trait]
pub trait Action: Send + Sync {
    fn definition(&self) -> &ActionDefinition;

    fn action_id(&self) -> &str {
        &self.definition().id
    }

    /// Logs a diagnostic description of this action.
    fn print(&self) {
        let definition = self.definition();
        tracing::info!(
            action_id = %definition.id,
            action_type = definition.action_type.as_str(),
            preconditions = definition.preconditions.len(),
            related_actions = definition.related_actions.len(),
            timing_data = definition.timing_data.len(),
            trigger_paths = ?definition.trigger_data.iter().map(|d| d.path.as_str()).collect::<Vec<_>>(),
            "Action definition"
        );
    }

    /// Runs the action, rewriting `context.status` on success.
    ///
    /// # Errors
    ///
    /// Any error aborts the invocation and leaves `context.status` untouched.
    async fn execute(&self, context: &mut LaunchContext) -> EcrResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definition_deserialization() {
        let json = json!({
            "id": "match-trigger-covid",
            "type": "match-trigger",
            "trigger_data": [
                {"path": "Condition.code", "data_type": "CodeableConcept"},
                {"path": "Observation.value"}
            ],
            "related_actions": [
                {"relationship": "before-start", "related_action_id": "create-eicr", "offset": "PT1H"}
            ],
            "timing_data": [{"duration": 6, "unit": "h"}]
        });

        let def: ActionDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(def.action_type, ActionType::MatchTrigger);
        assert_eq!(def.trigger_data.len(), 2);
        assert_eq!(def.trigger_data[0].data_type.as_deref(), Some("CodeableConcept"));
        assert!(def.preconditions.is_empty());
        assert_eq!(def.related_actions[0].offset.as_deref(), Some("PT1H"));
        assert_eq!(def.timing_data[0].frequency, None);
    }

    #[test]
    fn test_unknown_action_type_is_rejected() {
        let json = json!({"id": "x", "type": "submit-eicr"});
        assert!(serde_json::from_value::<ActionDefinition>(json).is_err());
    }

    #[test]
    fn test_display_lists_paths_in_order() {
        let def = ActionDefinition::match_trigger("mt", ["Condition.code", "Observation.code"]);
        let text = def.to_string();
        assert!(text.starts_with("Action mt (match-trigger)"));
        let first = text.find("Condition.code").unwrap();
        let second = text.find("Observation.code").unwrap();
        assert!(first < second);
    }
}
