//! Load-time validation errors for buff definitions.

use crate::error::{BuffEngineError, ErrorSeverity};
use crate::formula::FormulaError;

/// Why a single definition entry was rejected.
///
/// These are per-entry: the registry logs them and keeps loading.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DefinitionError {
    #[error("definition id is empty")]
    EmptyId,

    #[error("definition id '{body}' does not match its catalog key '{key}'")]
    IdMismatch { key: String, body: String },

    #[error("max_stack must be at least 1")]
    ZeroMaxStack,

    #[error("base_duration must be finite and non-negative (got {0})")]
    InvalidDuration(f64),

    #[error("effect {effect}: target_property is empty")]
    MissingProperty { effect: usize },

    #[error("effect {effect}: custom effect has no handler key")]
    MissingHandler { effect: usize },

    #[error("effect {effect}: values must be finite")]
    NonFiniteValue { effect: usize },

    #[error("effect {effect}: periodic interval must be positive (got {interval})")]
    InvalidInterval { effect: usize, interval: f64 },

    #[error("effect {effect}: event/condition trigger has no name")]
    MissingTriggerName { effect: usize },

    #[error("effect {effect}: formula value type requires a formula")]
    MissingFormula { effect: usize },

    #[error("effect {effect}: {source}")]
    Formula {
        effect: usize,
        #[source]
        source: FormulaError,
    },

    #[error("malformed entry: {0}")]
    Malformed(String),
}

impl BuffEngineError for DefinitionError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyId => "empty_id",
            Self::IdMismatch { .. } => "id_mismatch",
            Self::ZeroMaxStack => "zero_max_stack",
            Self::InvalidDuration(_) => "invalid_duration",
            Self::MissingProperty { .. } => "missing_property",
            Self::MissingHandler { .. } => "missing_handler",
            Self::NonFiniteValue { .. } => "non_finite_value",
            Self::InvalidInterval { .. } => "invalid_interval",
            Self::MissingTriggerName { .. } => "missing_trigger_name",
            Self::MissingFormula { .. } => "missing_formula",
            Self::Formula { .. } => "formula",
            Self::Malformed(_) => "malformed",
        }
    }
}
