//! Versioned launch-context storage.
//!
//! Every write is a compare-and-swap against the `state_version` the writer
//! read. A writer holding a stale version is rejected with
//! `EcrError::ConcurrentModification` instead of silently overwriting the
//! other writer's execution state.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ecr_core::{EcrError, EcrResult, LaunchContext};

/// Storage for launch contexts keyed by launch id.
#[async_trait]
pub trait LaunchContextStore: Send + Sync {
    /// Stores a new launch context at version 0.
    ///
    /// # Errors
    ///
    /// Returns `EcrError::ConcurrentModification` if the launch id is taken.
    async fn insert(&self, context: LaunchContext) -> EcrResult<LaunchContext>;

    /// Reads a launch context.
    async fn get(&self, launch_id: &str) -> EcrResult<Option<LaunchContext>>;

    /// Replaces a stored context if its version still equals
    /// `expected_version`, returning the stored copy with the bumped version.
    ///
    /// # Errors
    ///
    /// Returns `EcrError::NotFound` for an unknown launch id and
    /// `EcrError::ConcurrentModification` on a version mismatch.
    async fn compare_and_swap(
        &self,
        context: LaunchContext,
        expected_version: u64,
    ) -> EcrResult<LaunchContext>;
}

/// In-memory store backed by a `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryLaunchContextStore {
    contexts: DashMap<String, LaunchContext>,
}

impl InMemoryLaunchContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[async_trait]
impl LaunchContextStore for InMemoryLaunchContextStore {
    async fn insert(&self, mut context: LaunchContext) -> EcrResult<LaunchContext> {
        match self.contexts.entry(context.launch_id.clone()) {
            Entry::Occupied(existing) => Err(EcrError::concurrent_modification(
                context.launch_id,
                0,
                existing.get().state_version,
            )),
            Entry::Vacant(slot) => {
                context.state_version = 0;
                slot.insert(context.clone());
                Ok(context)
            }
        }
    }

    async fn get(&self, launch_id: &str) -> EcrResult<Option<LaunchContext>> {
        Ok(self.contexts.get(launch_id).map(|entry| entry.clone()))
    }

    async fn compare_and_swap(
        &self,
        mut context: LaunchContext,
        expected_version: u64,
    ) -> EcrResult<LaunchContext> {
        let Some(mut stored) = self.contexts.get_mut(&context.launch_id) else {
            return Err(EcrError::not_found(context.launch_id));
        };

        if stored.state_version != expected_version {
            tracing::warn!(
                launch_id = %context.launch_id,
                expected = expected_version,
                actual = stored.state_version,
                "Rejected stale launch context write"
            );
            return Err(EcrError::concurrent_modification(
                context.launch_id,
                expected_version,
                stored.state_version,
            ));
        }

        context.state_version = expected_version + 1;
        *stored = context.clone();
        Ok(context)
    }
}
