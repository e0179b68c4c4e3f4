//! Effect templates: one numeric contribution or one mutating action of a buff.

use crate::definition::DefinitionError;
use crate::formula::Formula;

/// What an effect does to its target property when it fires.
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
pub enum EffectType {
    /// `value + magnitude`
    #[default]
    Add,
    /// `value * magnitude`
    Multiply,
    /// `magnitude`
    Set,
    /// `value * (1 + magnitude / 100)`
    PercentIncrease,
    /// `value * (1 - magnitude / 100)`
    PercentDecrease,
    /// Dispatched to a registered [`crate::CustomEffectHandler`].
    Custom,
}

impl EffectType {
    /// Returns true for every type with built-in arithmetic, i.e. the ones
    /// the calculator folds and the trigger runner writes back.
    pub const fn is_mutating(&self) -> bool {
        !matches!(self, Self::Custom)
    }
}

/// How the effect's numeric value is expressed.
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
pub enum ValueType {
    #[default]
    Flat,
    /// For `Add` triggers the magnitude is a percentage of the current value.
    Percentage,
    /// Magnitude comes from the effect's formula.
    Formula,
}

/// Property Calculator phase that consumes a Continuous effect.
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
pub enum CalculationType {
    #[default]
    Additive,
    Multiplicative,
    Final,
    Override,
}

/// When (and whether) the trigger runner fires an effect.
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
pub enum TriggerTiming {
    OnApply,
    OnRemove,
    /// Read-only input to the property calculator. Never fired.
    #[default]
    Continuous,
    Periodic,
    OnEvent,
    OnCondition,
}

impl TriggerTiming {
    /// Returns true for timings that perform a discrete mutation.
    pub const fn is_discrete(&self) -> bool {
        !matches!(self, Self::Continuous)
    }
}

/// Immutable template for one effect of a buff.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EffectDefinition {
    pub effect_type: EffectType,
    pub target_property: String,
    pub value_type: ValueType,
    pub base_value: f64,
    pub per_stack_value: f64,
    pub calculation_type: CalculationType,
    pub trigger_timing: TriggerTiming,
    /// Seconds between Periodic firings.
    pub trigger_interval: f64,
    pub formula: Option<String>,
    /// Event name matched by OnEvent effects.
    pub event_name: Option<String>,
    /// Condition name matched by OnCondition effects.
    pub condition: Option<String>,
    /// Handler key for Custom effects. Falls back to `target_property`.
    pub handler: Option<String>,

    #[cfg_attr(feature = "serde", serde(skip))]
    compiled: Option<Formula>,
}

impl Default for EffectDefinition {
    fn default() -> Self {
        Self {
            effect_type: EffectType::Add,
            target_property: String::new(),
            value_type: ValueType::Flat,
            base_value: 0.0,
            per_stack_value: 0.0,
            calculation_type: CalculationType::Additive,
            trigger_timing: TriggerTiming::Continuous,
            trigger_interval: 0.0,
            formula: None,
            event_name: None,
            condition: None,
            handler: None,
            compiled: None,
        }
    }
}

impl EffectDefinition {
    /// Continuous calculator input on `property`.
    pub fn continuous(
        property: impl Into<String>,
        calculation_type: CalculationType,
        base_value: f64,
    ) -> Self {
        Self {
            target_property: property.into(),
            calculation_type,
            base_value,
            trigger_timing: TriggerTiming::Continuous,
            ..Self::default()
        }
    }

    /// Mutating effect fired every `interval` seconds.
    pub fn periodic(
        effect_type: EffectType,
        property: impl Into<String>,
        interval: f64,
        base_value: f64,
    ) -> Self {
        Self {
            effect_type,
            target_property: property.into(),
            base_value,
            trigger_timing: TriggerTiming::Periodic,
            trigger_interval: interval,
            ..Self::default()
        }
    }

    /// Mutating effect fired once at the given discrete timing.
    pub fn triggered(
        timing: TriggerTiming,
        effect_type: EffectType,
        property: impl Into<String>,
        base_value: f64,
    ) -> Self {
        Self {
            effect_type,
            target_property: property.into(),
            base_value,
            trigger_timing: timing,
            ..Self::default()
        }
    }

    /// Custom effect dispatched to the handler registered under `handler`.
    pub fn custom(timing: TriggerTiming, handler: impl Into<String>) -> Self {
        Self {
            effect_type: EffectType::Custom,
            trigger_timing: timing,
            handler: Some(handler.into()),
            ..Self::default()
        }
    }

    /// Sets the per-stack increment (builder pattern).
    pub fn per_stack(mut self, value: f64) -> Self {
        self.per_stack_value = value;
        self
    }

    /// Sets the value type (builder pattern).
    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Attaches a formula and switches the value type to `Formula`.
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self.value_type = ValueType::Formula;
        self.compiled = None;
        self
    }

    /// Sets the event name for OnEvent effects (builder pattern).
    pub fn on_event(mut self, event: impl Into<String>) -> Self {
        self.event_name = Some(event.into());
        self
    }

    /// Sets the condition name for OnCondition effects (builder pattern).
    pub fn on_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Key used to find the Custom handler for this effect.
    pub fn handler_key(&self) -> &str {
        self.handler.as_deref().unwrap_or(&self.target_property)
    }

    /// Compiled formula, if one was attached and [`Self::compile`] ran.
    pub fn compiled_formula(&self) -> Option<&Formula> {
        self.compiled.as_ref()
    }

    /// Validates the effect and compiles its formula.
    ///
    /// `index` is the position inside the owning buff, used for error context.
    pub fn compile(&mut self, index: usize) -> Result<(), DefinitionError> {
        if self.effect_type != EffectType::Custom && self.target_property.is_empty() {
            return Err(DefinitionError::MissingProperty { effect: index });
        }

        if self.effect_type == EffectType::Custom && self.handler_key().is_empty() {
            return Err(DefinitionError::MissingHandler { effect: index });
        }

        if !self.base_value.is_finite() || !self.per_stack_value.is_finite() {
            return Err(DefinitionError::NonFiniteValue { effect: index });
        }

        match self.trigger_timing {
            TriggerTiming::Periodic => {
                if !(self.trigger_interval.is_finite() && self.trigger_interval > 0.0) {
                    return Err(DefinitionError::InvalidInterval {
                        effect: index,
                        interval: self.trigger_interval,
                    });
                }
            }
            TriggerTiming::OnEvent if self.event_name.is_none() => {
                return Err(DefinitionError::MissingTriggerName { effect: index });
            }
            TriggerTiming::OnCondition if self.condition.is_none() => {
                return Err(DefinitionError::MissingTriggerName { effect: index });
            }
            _ => {}
        }

        self.compiled = match &self.formula {
            Some(source) => Some(
                Formula::parse(source)
                    .map_err(|source| DefinitionError::Formula { effect: index, source })?,
            ),
            None if self.value_type == ValueType::Formula => {
                return Err(DefinitionError::MissingFormula { effect: index });
            }
            None => None,
        };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_names_parse_case_insensitively() {
        assert_eq!("percent_increase".parse(), Ok(EffectType::PercentIncrease));
        assert_eq!("OVERRIDE".parse(), Ok(CalculationType::Override));
        assert_eq!("on_apply".parse(), Ok(TriggerTiming::OnApply));
        assert_eq!(TriggerTiming::OnCondition.to_string(), "on_condition");
    }

    #[test]
    fn compile_rejects_zero_interval() {
        let mut effect = EffectDefinition::periodic(EffectType::Add, "hp", 0.0, -5.0);
        assert!(matches!(
            effect.compile(2),
            Err(DefinitionError::InvalidInterval { effect: 2, .. })
        ));
    }

    #[test]
    fn compile_requires_formula_for_formula_values() {
        let mut effect = EffectDefinition::continuous("attack", CalculationType::Additive, 1.0)
            .value_type(ValueType::Formula);
        assert!(matches!(
            effect.compile(0),
            Err(DefinitionError::MissingFormula { effect: 0 })
        ));
    }

    #[test]
    fn compile_caches_parsed_formula() {
        let mut effect = EffectDefinition::continuous("attack", CalculationType::Additive, 0.0)
            .with_formula("stack * 2");
        assert!(effect.compiled_formula().is_none());
        effect.compile(0).expect("formula should compile");
        assert!(effect.compiled_formula().is_some());
    }

    #[test]
    fn compile_reports_formula_syntax_errors() {
        let mut effect = EffectDefinition::continuous("attack", CalculationType::Additive, 0.0)
            .with_formula("stack * (2");
        assert!(matches!(
            effect.compile(1),
            Err(DefinitionError::Formula { effect: 1, .. })
        ));
    }

    #[test]
    fn custom_handler_falls_back_to_property() {
        let mut effect = EffectDefinition::custom(TriggerTiming::OnApply, "spawn_shield");
        assert_eq!(effect.handler_key(), "spawn_shield");
        effect.handler = None;
        effect.target_property = "shield".into();
        assert_eq!(effect.handler_key(), "shield");
    }

    #[test]
    fn on_event_requires_a_name() {
        let mut effect =
            EffectDefinition::triggered(TriggerTiming::OnEvent, EffectType::Add, "rage", 5.0);
        assert!(effect.compile(0).is_err());
        let mut effect = effect.on_event("hit_taken");
        assert!(effect.compile(0).is_ok());
    }
}
