//! Builds configured actions and runs them against launch contexts.

use ecr_core::{EcrError, EcrResult, LaunchContext};
use std::sync::Arc;
use tracing::{info, warn};

use crate::action::{Action, ActionDefinition, ActionType};
use crate::config::{EngineConfig, MatchPolicy};
use crate::match_trigger::MatchTriggerAction;
use crate::registry::ActionRegistry;
use crate::store::LaunchContextStore;

/// Turns action definitions into executable actions.
#[derive(Debug, Clone)]
pub struct ActionFactory {
    registry: Arc<ActionRegistry>,
    policy: MatchPolicy,
}

impl ActionFactory {
    pub fn new(registry: Arc<ActionRegistry>, policy: MatchPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn build(&self, definition: &ActionDefinition) -> EcrResult<Arc<dyn Action>> {
        match definition.action_type {
            ActionType::MatchTrigger => {
                if definition.trigger_data.is_empty() {
                    warn!(action_id = %definition.id, "Match trigger action has no trigger paths");
                }
                Ok(Arc::new(MatchTriggerAction::new(
                    definition.clone(),
                    Arc::clone(&self.registry),
                    self.policy,
                )))
            }
        }
    }
}

/// An ordered list of actions.
#[derive(Clone, Default)]
pub struct Workflow {
    actions: Vec<Arc<dyn Action>>,
}

impl Workflow {
    pub fn new(actions: Vec<Arc<dyn Action>>) -> Self {
        Self { actions }
    }

    /// Builds every action in `definitions`, in order.
    ///
    /// # Errors
    ///
    /// Returns `EcrError::Configuration` if any definition cannot be built.
    pub fn from_definitions(
        factory: &ActionFactory,
        definitions: &[ActionDefinition],
    ) -> EcrResult<Self> {
        let actions = definitions
            .iter()
            .map(|definition| factory.build(definition))
            .collect::<EcrResult<Vec<_>>>()?;
        Ok(Self::new(actions))
    }

    /// Builds the workflow described by an engine configuration.
    pub fn from_config(registry: Arc<ActionRegistry>, config: &EngineConfig) -> EcrResult<Self> {
        config.validate().map_err(EcrError::configuration)?;
        let factory = ActionFactory::new(registry, config.match_policy);
        Self::from_definitions(&factory, &config.actions)
    }

    pub fn actions(&self) -> &[Arc<dyn Action>] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Runs every action against `context`.
    ///
    /// Actions run on a working copy; `context` is replaced only when all of
    /// them succeed.
    pub async fn run(&self, context: &mut LaunchContext) -> EcrResult<()> {
        let mut working = context.clone();
        for action in &self.actions {
            action.execute(&mut working).await?;
        }
        *context = working;
        Ok(())
    }

    /// Runs the workflow against a stored launch and writes the result back
    /// with a compare-and-swap on the version read.
    ///
    /// # Errors
    ///
    /// Returns `EcrError::NotFound` for an unknown launch and
    /// `EcrError::ConcurrentModification` if another writer committed first.
    /// The stored context is unchanged on any error.
    pub async fn run_stored(
        &self,
        store: &dyn LaunchContextStore,
        launch_id: &str,
    ) -> EcrResult<LaunchContext> {
        let mut context = store
            .get(launch_id)
            .await?
            .ok_or_else(|| EcrError::not_found(launch_id))?;
        let expected_version = context.state_version;

        self.run(&mut context).await?;

        let stored = store.compare_and_swap(context, expected_version).await?;
        info!(
            launch_id,
            state_version = stored.state_version,
            "Launch execution state committed"
        );
        Ok(stored)
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.actions.iter().map(|a| a.action_id()))
            .finish()
    }
}
