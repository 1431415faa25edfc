//! Collaborator lookup for workflow actions.
//!
//! The registry is built once at startup and never mutated afterwards, so it
//! can be shared across threads behind an `Arc` without locking. Actions
//! receive it at construction time instead of reaching for global state.

use std::fmt;
use std::sync::Arc;

use crate::services::{
    DataRetrievalService, DynDataRetrieval, DynValueSetProvider, ValueSetProvider,
};

/// Read-only table of collaborator services.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    data_retrieval: Option<DynDataRetrieval>,
    value_sets: Option<DynValueSetProvider>,
}

impl ActionRegistry {
    pub fn builder() -> ActionRegistryBuilder {
        ActionRegistryBuilder::default()
    }

    /// Data-retrieval service, or `None` if none was registered.
    pub fn data_retrieval(&self) -> Option<DynDataRetrieval> {
        self.data_retrieval.clone()
    }

    /// Reportable value-set provider, or `None` if none was registered.
    pub fn value_sets(&self) -> Option<DynValueSetProvider> {
        self.value_sets.clone()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("data_retrieval", &self.data_retrieval.is_some())
            .field("value_sets", &self.value_sets.is_some())
            .finish()
    }
}

/// Builder for [`ActionRegistry`].
#[derive(Default)]
pub struct ActionRegistryBuilder {
    data_retrieval: Option<DynDataRetrieval>,
    value_sets: Option<DynValueSetProvider>,
}

impl ActionRegistryBuilder {
    #[must_use]
    pub fn data_retrieval(mut self, service: Arc<dyn DataRetrievalService>) -> Self {
        self.data_retrieval = Some(service);
        self
    }

    #[must_use]
    pub fn value_sets(mut self, provider: Arc<dyn ValueSetProvider>) -> Self {
        self.value_sets = Some(provider);
        self
    }

    /// Freezes the registry.
    pub fn build(self) -> Arc<ActionRegistry> {
        tracing::debug!(
            data_retrieval = self.data_retrieval.is_some(),
            value_sets = self.value_sets.is_some(),
            "Action registry initialized"
        );
        Arc::new(ActionRegistry {
            data_retrieval: self.data_retrieval,
            value_sets: self.value_sets,
        })
    }
}
