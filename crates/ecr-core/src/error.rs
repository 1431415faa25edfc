//! Error types for the trigger-evaluation engine.
//!
//! Every fatal condition aborts the invocation and surfaces as an [`EcrError`].
//! Callers match on [`EcrError::kind`] rather than on message text.

use std::fmt;

/// Result type for engine operations.
pub type EcrResult<T> = Result<T, EcrError>;

/// Errors that abort an action invocation.
#[derive(Debug, thiserror::Error)]
pub enum EcrError {
    /// The launch context handed to an action is not usable.
    #[error("Precondition violation: {message}")]
    PreconditionViolation {
        /// What was wrong with the input.
        message: String,
    },

    /// The persisted execution state could not be parsed.
    #[error("Execution state corrupted: {message}")]
    StateCorruption {
        /// Parser diagnostic.
        message: String,
    },

    /// A required collaborator is missing or the action is misconfigured.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the missing or invalid configuration.
        message: String,
    },

    /// The data-retrieval collaborator produced no usable data.
    #[error("Retrieval failure: {message}")]
    RetrievalFailure {
        /// Description of the retrieval problem.
        message: String,
    },

    /// The updated execution state could not be serialized.
    #[error("Serialization failure: {message}")]
    SerializationFailure {
        /// Serializer diagnostic.
        message: String,
    },

    /// The stored launch context changed between read and write.
    #[error("Concurrent modification of launch {launch_id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        /// Launch whose state was modified.
        launch_id: String,
        /// Version read before executing.
        expected: u64,
        /// Version found at write time.
        actual: u64,
    },

    /// No launch context is stored under the given id.
    #[error("Launch context not found: {launch_id}")]
    NotFound {
        /// The missing launch id.
        launch_id: String,
    },
}

impl EcrError {
    /// Creates a new `PreconditionViolation` error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            message: message.into(),
        }
    }

    /// Creates a new `StateCorruption` error.
    #[must_use]
    pub fn state_corruption(message: impl Into<String>) -> Self {
        Self::StateCorruption {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `RetrievalFailure` error.
    #[must_use]
    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::RetrievalFailure {
            message: message.into(),
        }
    }

    /// Creates a new `SerializationFailure` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationFailure {
            message: message.into(),
        }
    }

    /// Creates a new `ConcurrentModification` error.
    #[must_use]
    pub fn concurrent_modification(launch_id: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::ConcurrentModification {
            launch_id: launch_id.into(),
            expected,
            actual,
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(launch_id: impl Into<String>) -> Self {
        Self::NotFound {
            launch_id: launch_id.into(),
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PreconditionViolation { .. } => ErrorKind::PreconditionViolation,
            Self::StateCorruption { .. } => ErrorKind::StateCorruption,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::RetrievalFailure { .. } => ErrorKind::RetrievalFailure,
            Self::SerializationFailure { .. } => ErrorKind::SerializationFailure,
            Self::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            Self::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// Returns `true` if retrying the whole invocation later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RetrievalFailure | ErrorKind::ConcurrentModification
        )
    }
}

/// Kinds of engine errors for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PreconditionViolation,
    StateCorruption,
    Configuration,
    RetrievalFailure,
    SerializationFailure,
    ConcurrentModification,
    NotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreconditionViolation => write!(f, "precondition_violation"),
            Self::StateCorruption => write!(f, "state_corruption"),
            Self::Configuration => write!(f, "configuration"),
            Self::RetrievalFailure => write!(f, "retrieval_failure"),
            Self::SerializationFailure => write!(f, "serialization_failure"),
            Self::ConcurrentModification => write!(f, "concurrent_modification"),
            Self::NotFound => write!(f, "not_found"),
        }
    }
}
