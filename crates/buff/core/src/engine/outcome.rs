//! Apply options and operation outcomes.

use crate::definition::BuffDefinition;
use crate::instance::{EntityId, InstanceId};

/// Per-application parameters for [`crate::BuffEngine::apply_buff`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ApplyOptions {
    /// Caster, recorded for provenance only.
    pub source: Option<EntityId>,
    /// Replaces the definition's `base_duration` for this application.
    pub duration: Option<f64>,
    /// Multiplier on every non-formula effect magnitude; also the strength
    /// compared by the Strongest stack rule.
    pub potency: f64,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            source: None,
            duration: None,
            potency: 1.0,
        }
    }
}

impl ApplyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the caster (builder pattern).
    pub fn from_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    /// Overrides the duration (builder pattern).
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the potency (builder pattern).
    pub fn with_potency(mut self, potency: f64) -> Self {
        self.potency = potency;
        self
    }

    /// Duration this application grants, falling back to the definition's.
    pub(crate) fn resolved_duration(&self, definition: &BuffDefinition) -> f64 {
        match self.duration {
            Some(duration) if duration.is_finite() => duration.max(0.0),
            Some(duration) => {
                tracing::warn!(
                    buff = %definition.id,
                    duration,
                    "ignoring non-finite duration override"
                );
                definition.base_duration
            }
            None => definition.base_duration,
        }
    }

    pub(crate) fn resolved_potency(&self, definition: &BuffDefinition) -> f64 {
        if self.potency.is_finite() {
            self.potency
        } else {
            tracing::warn!(
                buff = %definition.id,
                potency = self.potency,
                "ignoring non-finite potency"
            );
            1.0
        }
    }
}

/// Why a reapplication left the existing instance untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum UnchangedReason {
    /// The definition's stack rule is `None`.
    RuleNone,
    /// `Stack` rule at `max_stack`.
    StackCapReached,
    /// `Strongest` rule and the incoming application was not stronger.
    WeakerApplication,
}

/// Result of a successful [`crate::BuffEngine::apply_buff`].
///
/// Every variant names the instance that is live afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A fresh instance was created.
    Created(InstanceId),
    /// Stack count grew to `stack`.
    Stacked { instance: InstanceId, stack: u32 },
    /// Duration was reset.
    Refreshed(InstanceId),
    /// Duration was lengthened.
    Extended(InstanceId),
    /// The existing instance was removed and a new one created.
    Replaced { old: InstanceId, new: InstanceId },
    /// Nothing changed.
    Unchanged {
        instance: InstanceId,
        reason: UnchangedReason,
    },
}

impl ApplyOutcome {
    /// The instance that carries the buff after this application.
    pub fn instance_id(&self) -> InstanceId {
        match *self {
            Self::Created(id) | Self::Refreshed(id) | Self::Extended(id) => id,
            Self::Stacked { instance, .. } | Self::Unchanged { instance, .. } => instance,
            Self::Replaced { new, .. } => new,
        }
    }

    /// Returns true if the application had any effect.
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged { .. })
    }
}

/// Result of [`crate::BuffEngine::remove_buff`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Unknown id, or an id owned by a different target.
    NotFound,
}

impl RemoveOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed)
    }
}
