//! Common error infrastructure for buff-core.
//!
//! This module provides the shared severity classification and the engine's
//! runtime error type. Load-time errors live next to the definition model
//! ([`crate::definition::DefinitionError`]) and formula errors next to the
//! formula language ([`crate::formula::FormulaError`]).
//!
//! # Design Principles
//!
//! - **Results, not panics**: every runtime failure is returned to the caller
//! - **Severity Classification**: errors are categorized for recovery strategies
//! - **Soft failures stay soft**: stack caps and unknown removals are outcomes,
//!   not errors

use crate::instance::EntityId;

/// Severity level of an error, used for categorization and recovery strategies.
///
/// Errors are classified by their recoverability and expected handling:
/// - **Recoverable**: Temporary conditions that may succeed later
/// - **Validation**: Invalid input that should be rejected without retry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - can retry later or with another target.
    ///
    /// Examples: target saturated with instances
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: unknown definition id, malformed definition entry
    Validation,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Common trait for all buff-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait BuffEngineError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Useful for log fields, metrics and tests.
    fn error_code(&self) -> &'static str;
}

/// Errors surfaced by [`crate::BuffEngine`] operations.
///
/// A rejected apply never creates a partial instance.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuffError {
    #[error("buff definition '{id}' not found")]
    DefinitionNotFound { id: String },

    #[error("entity {target} cannot carry buffs")]
    InvalidTarget { target: EntityId },

    #[error("entity {target} already carries the maximum of {limit} buff instances")]
    TargetSaturated { target: EntityId, limit: usize },
}

impl BuffEngineError for BuffError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DefinitionNotFound { .. } | Self::InvalidTarget { .. } => {
                ErrorSeverity::Validation
            }
            Self::TargetSaturated { .. } => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DefinitionNotFound { .. } => "definition_not_found",
            Self::InvalidTarget { .. } => "invalid_target",
            Self::TargetSaturated { .. } => "target_saturated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_classification() {
        let missing = BuffError::DefinitionNotFound { id: "haste".into() };
        assert_eq!(missing.severity(), ErrorSeverity::Validation);
        assert!(!missing.severity().is_recoverable());
        assert_eq!(missing.severity().as_str(), "validation");

        let full = BuffError::TargetSaturated {
            target: EntityId(3),
            limit: 8,
        };
        assert!(full.severity().is_recoverable());
        assert_eq!(full.error_code(), "target_saturated");
    }

    #[test]
    fn display_names_the_definition() {
        let err = BuffError::DefinitionNotFound { id: "haste".into() };
        assert_eq!(err.to_string(), "buff definition 'haste' not found");
    }
}
