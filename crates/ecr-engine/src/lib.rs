//! Trigger-evaluation engine for electronic case reporting.
//!
//! This crate decides whether codes observed in a patient's clinical data match
//! the reportable-condition value set, and records that decision in the
//! launch context so later workflow steps can act on it:
//! - [`Action`]: the contract every workflow step implements
//! - [`MatchTriggerAction`]: the code-matching step
//! - [`ActionRegistry`]: injected collaborator lookup (data retrieval, value sets)
//! - [`Workflow`]: runs configured actions, optionally through a versioned store
//!
//! # Architecture
//!
//! ```text
//! LaunchContext ──► Workflow ──► Action::execute ──► ActionRegistry
//!      ▲                              │                 ├── DataRetrievalService
//!      │                              ▼                 └── ValueSetProvider
//!      └────── status (JSON) ◄── PatientExecutionState ◄── match_codes
//! ```

pub mod action;
pub mod config;
pub mod match_trigger;
pub mod matcher;
pub mod registry;
pub mod services;
pub mod store;
pub mod value_set;
pub mod workflow;

pub use action::{
    Action, ActionData, ActionDefinition, ActionType, Condition, ConditionKind, RelatedAction,
    TimingSchedule,
};
pub use config::{EngineConfig, MatchPolicy};
pub use match_trigger::MatchTriggerAction;
pub use matcher::{CodeMatch, match_codes};
pub use registry::{ActionRegistry, ActionRegistryBuilder};
pub use services::{DataRetrievalService, ValueSetProvider};
pub use store::{InMemoryLaunchContextStore, LaunchContextStore};
pub use value_set::{ReferenceValueSet, StaticValueSetProvider};
pub use workflow::{ActionFactory, Workflow};
