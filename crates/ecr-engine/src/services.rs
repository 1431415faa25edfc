//! Collaborator roles the engine resolves through the [`ActionRegistry`].
//!
//! [`ActionRegistry`]: crate::registry::ActionRegistry

use async_trait::async_trait;
use ecr_core::{ClinicalData, EcrResult, LaunchContext};
use std::sync::Arc;
use time::OffsetDateTime;

use crate::value_set::ReferenceValueSet;

/// Retrieves clinical data for a launch.
///
/// Implementations own their timeout policy. `Ok(None)` means nothing usable
/// was retrieved; the engine treats it exactly like an error.
#[async_trait]
pub trait DataRetrievalService: Send + Sync {
    async fn get_data(
        &self,
        context: &LaunchContext,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> EcrResult<Option<ClinicalData>>;
}

/// Supplies the reportable-condition value set.
pub trait ValueSetProvider: Send + Sync {
    /// Point-in-time snapshot of the reportable codes.
    fn reportable_value_set(&self) -> Arc<ReferenceValueSet>;
}

/// Shared data-retrieval service.
pub type DynDataRetrieval = Arc<dyn DataRetrievalService>;

/// Shared value-set provider.
pub type DynValueSetProvider = Arc<dyn ValueSetProvider>;
