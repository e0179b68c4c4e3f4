//! Immutable buff templates and the registry that indexes them.
//!
//! A [`BuffDefinition`] describes everything that does not change while a buff
//! is active: its stacking policy, duration, priority and the ordered list of
//! [`EffectDefinition`]s. Runtime state lives in [`crate::instance`].
//!
//! Definitions become usable once [`BuffDefinition::compile`] has validated
//! them and pre-parsed their formulas. The [`DefinitionRegistry`] does this on
//! load; malformed entries are skipped, never fatal.

mod effect;
mod error;
mod registry;

pub use effect::{CalculationType, EffectDefinition, EffectType, TriggerTiming, ValueType};
pub use error::DefinitionError;
pub use registry::{DefinitionRegistry, LoadReport};

use std::collections::BTreeSet;

/// Data files spell enum values as strings, matched case-insensitively.
#[cfg(feature = "serde")]
macro_rules! string_serde {
    ($($ty:ty),* $(,)?) => {$(
        impl TryFrom<String> for $ty {
            type Error = strum::ParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_ref().to_string()
            }
        }
    )*};
}

#[cfg(feature = "serde")]
string_serde!(
    BuffKind,
    StackRule,
    EffectType,
    ValueType,
    CalculationType,
    TriggerTiming,
);

/// Broad classification used by dispel and UI grouping.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BuffKind {
    #[default]
    Buff,
    Debuff,
    Neutral,
}

/// Policy applied when a definition is reapplied to a target that already
/// carries it.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StackRule {
    /// Reapplication is ignored.
    None,
    /// Existing instance is removed and a fresh one created.
    Replace,
    /// Duration is reset; stacks and effect state are kept.
    #[default]
    Refresh,
    /// Stack count grows up to `max_stack`; duration untouched.
    Stack,
    /// Duration grows by the applied duration.
    Extend,
    /// The stronger application survives.
    Strongest,
}

/// Immutable template for a buff or debuff.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BuffDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: BuffKind,
    pub category: String,
    pub max_stack: u32,
    pub stack_rule: StackRule,
    /// Seconds. Ignored while `persistent` is set.
    pub base_duration: f64,
    /// Ascending: lower priorities are evaluated first.
    pub priority: i32,
    pub persistent: bool,
    pub dispellable: bool,
    pub tags: BTreeSet<String>,
    pub effects: Vec<EffectDefinition>,
}

impl Default for BuffDefinition {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            kind: BuffKind::Buff,
            category: String::new(),
            max_stack: 1,
            stack_rule: StackRule::Refresh,
            base_duration: 0.0,
            priority: 0,
            persistent: false,
            dispellable: true,
            tags: BTreeSet::new(),
            effects: Vec::new(),
        }
    }
}

impl BuffDefinition {
    /// Creates a definition with the given id and duration; everything else
    /// takes its default.
    pub fn new(id: impl Into<String>, base_duration: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            base_duration,
            ..Self::default()
        }
    }

    /// Sets the kind (builder pattern).
    pub fn kind(mut self, kind: BuffKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the stack rule and cap (builder pattern).
    pub fn stacking(mut self, rule: StackRule, max_stack: u32) -> Self {
        self.stack_rule = rule;
        self.max_stack = max_stack;
        self
    }

    /// Sets the priority (builder pattern).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Marks the buff persistent (builder pattern).
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    /// Sets the dispellable flag (builder pattern).
    pub fn dispellable(mut self, dispellable: bool) -> Self {
        self.dispellable = dispellable;
        self
    }

    /// Adds a tag (builder pattern).
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Appends an effect (builder pattern).
    pub fn effect(mut self, effect: EffectDefinition) -> Self {
        self.effects.push(effect);
        self
    }

    /// Returns true if the definition carries the tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Validates the definition and compiles every effect formula.
    pub fn compile(&mut self) -> Result<(), DefinitionError> {
        if self.id.trim().is_empty() {
            return Err(DefinitionError::EmptyId);
        }
        if self.max_stack == 0 {
            return Err(DefinitionError::ZeroMaxStack);
        }
        if !(self.base_duration.is_finite() && self.base_duration >= 0.0) {
            return Err(DefinitionError::InvalidDuration(self.base_duration));
        }
        for (index, effect) in self.effects.iter_mut().enumerate() {
            effect.compile(index)?;
        }
        Ok(())
    }

    /// Validates and compiles, consuming the definition (builder pattern).
    pub fn compiled(mut self) -> Result<Self, DefinitionError> {
        self.compile()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_single_stack_refresh() {
        let def = BuffDefinition::new("haste", 10.0);
        assert_eq!(def.name, "haste");
        assert_eq!(def.max_stack, 1);
        assert_eq!(def.stack_rule, StackRule::Refresh);
        assert!(def.dispellable);
        assert!(!def.persistent);
    }

    #[test]
    fn compile_rejects_invalid_templates() {
        assert_eq!(
            BuffDefinition::new("  ", 1.0).compiled(),
            Err(DefinitionError::EmptyId)
        );
        assert_eq!(
            BuffDefinition::new("x", 1.0)
                .stacking(StackRule::Stack, 0)
                .compiled(),
            Err(DefinitionError::ZeroMaxStack)
        );
        assert!(matches!(
            BuffDefinition::new("x", -1.0).compiled(),
            Err(DefinitionError::InvalidDuration(_))
        ));
    }

    #[test]
    fn compile_reports_first_bad_effect() {
        let def = BuffDefinition::new("bleed", 5.0)
            .effect(EffectDefinition::periodic(EffectType::Add, "hp", 1.0, -2.0))
            .effect(EffectDefinition::periodic(EffectType::Add, "hp", -1.0, -2.0));
        assert!(matches!(
            def.compiled(),
            Err(DefinitionError::InvalidInterval { effect: 1, .. })
        ));
    }

    #[test]
    fn tags_are_queryable() {
        let def = BuffDefinition::new("burn", 3.0).tag("fire").tag("dot");
        assert!(def.has_tag("fire"));
        assert!(!def.has_tag("ice"));
    }

    #[test]
    fn stack_rule_names() {
        assert_eq!("strongest".parse(), Ok(StackRule::Strongest));
        assert_eq!(BuffKind::Debuff.as_ref(), "debuff");
    }
}
