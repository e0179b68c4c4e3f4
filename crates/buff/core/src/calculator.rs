//! Property calculator: effective value of a property under active buffs.
//!
//! The pipeline runs in a fixed order:
//! Base → Additive → Multiplicative → Final/Override
//!
//! Every phase scans instances in ascending definition priority (ties broken
//! by creation order). Only Continuous, active, non-Custom effects whose
//! `target_property` matches contribute.
//!
//! # Formula
//! ```text
//! result = (base + Σ additive) × Π(1 + multiplicative/100)
//! then, in priority order: Final adds, Override replaces
//! ```
//!
//! Calculation is pure: it never touches the target or the instances.

use crate::definition::{CalculationType, EffectDefinition};
use crate::instance::{BuffInstance, EffectInstance, magnitude};

/// Intermediate values of one calculation.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyBreakdown {
    pub base: f64,
    /// Sum of Additive contributions.
    pub additive: f64,
    /// Product of `(1 + m/100)` over Multiplicative contributions.
    pub multiplier: f64,
    /// Sum of Final contributions.
    pub final_bonus: f64,
    /// Last Override processed, if any.
    pub override_value: Option<f64>,
    pub result: f64,
}

impl PropertyBreakdown {
    /// Returns true if an Override effect decided the result.
    pub fn is_overridden(&self) -> bool {
        self.override_value.is_some()
    }
}

fn contributes(effect: &EffectDefinition, state: &EffectInstance, property: &str) -> bool {
    state.is_active()
        && !effect.trigger_timing.is_discrete()
        && effect.effect_type.is_mutating()
        && effect.target_property == property
}

/// Orders instances by `(priority, id)`.
fn ordered<'a>(
    instances: impl IntoIterator<Item = &'a BuffInstance>,
) -> Vec<&'a BuffInstance> {
    let mut ordered: Vec<_> = instances.into_iter().collect();
    ordered.sort_by_key(|instance| (instance.definition().priority, instance.id()));
    ordered
}

/// Runs the pipeline and returns every intermediate value.
///
/// `now` is the engine clock, used for formula `elapsed`.
pub fn calculate_breakdown<'a>(
    base: f64,
    property: &str,
    instances: impl IntoIterator<Item = &'a BuffInstance>,
    now: f64,
) -> PropertyBreakdown {
    let instances = ordered(instances);
    let matching = || {
        instances.iter().flat_map(move |instance| {
            instance
                .effects()
                .filter(move |(effect, state)| contributes(effect, state, property))
                .map(move |(effect, _)| (*instance, effect))
        })
    };

    let additive: f64 = matching()
        .filter(|(_, effect)| effect.calculation_type == CalculationType::Additive)
        .map(|(instance, effect)| magnitude(instance, effect, now))
        .sum();

    let multiplier: f64 = matching()
        .filter(|(_, effect)| effect.calculation_type == CalculationType::Multiplicative)
        .map(|(instance, effect)| 1.0 + magnitude(instance, effect, now) / 100.0)
        .product();

    let mut result = (base + additive) * multiplier;
    tracing::trace!(property, base, additive, multiplier, "additive and multiplicative phases");

    let mut final_bonus = 0.0;
    let mut override_value = None;
    for (instance, effect) in matching() {
        match effect.calculation_type {
            CalculationType::Final => {
                let value = magnitude(instance, effect, now);
                final_bonus += value;
                result += value;
            }
            CalculationType::Override => {
                let value = magnitude(instance, effect, now);
                override_value = Some(value);
                result = value;
            }
            CalculationType::Additive | CalculationType::Multiplicative => {}
        }
    }
    tracing::trace!(property, result, overridden = override_value.is_some(), "final phase");

    PropertyBreakdown {
        base,
        additive,
        multiplier,
        final_bonus,
        override_value,
        result,
    }
}

/// Effective value of `property` starting from `base`.
pub fn calculate<'a>(
    base: f64,
    property: &str,
    instances: impl IntoIterator<Item = &'a BuffInstance>,
    now: f64,
) -> f64 {
    calculate_breakdown(base, property, instances, now).result
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::definition::{BuffDefinition, EffectType, StackRule, TriggerTiming};
    use crate::instance::{EntityId, InstanceId};

    fn instance(id: u64, def: BuffDefinition) -> BuffInstance {
        let def = def.compiled().expect("valid definition");
        BuffInstance::new(InstanceId(id), Arc::new(def), EntityId(1), None, 10.0, 1.0, 0.0)
    }

    fn effect(calc: CalculationType, value: f64) -> EffectDefinition {
        EffectDefinition::continuous("speed", calc, value)
    }

    /// One-effect buff on "speed".
    fn single(id: u64, priority: i32, calc: CalculationType, value: f64) -> BuffInstance {
        let name = format!("buff{id}");
        instance(
            id,
            BuffDefinition::new(name, 5.0)
                .priority(priority)
                .effect(effect(calc, value)),
        )
    }

    #[test]
    fn multiplicative_effects_compound() {
        let a = single(1, 0, CalculationType::Multiplicative, 20.0);
        let b = single(2, 0, CalculationType::Multiplicative, 10.0);

        let breakdown = calculate_breakdown(100.0, "speed", [&a, &b], 0.0);
        assert!((breakdown.result - 132.0).abs() < 1e-9);
        assert!((breakdown.multiplier - 1.32).abs() < 1e-9);
        assert!(!breakdown.is_overridden());
    }

    #[test]
    fn phases_apply_in_order() {
        let buff = instance(
            1,
            BuffDefinition::new("combo", 5.0)
                .effect(effect(CalculationType::Final, 7.0))
                .effect(effect(CalculationType::Multiplicative, 50.0))
                .effect(effect(CalculationType::Additive, 10.0)),
        );
        // (10 + 10) * 1.5 + 7
        assert_eq!(calculate(10.0, "speed", [&buff], 0.0), 37.0);
    }

    #[test]
    fn last_override_in_priority_order_wins() {
        let low = single(1, 5, CalculationType::Override, 1.0);
        let high = single(2, -5, CalculationType::Override, 2.0);
        let add = single(3, 0, CalculationType::Final, 100.0);

        // Order: high (-5) → add (0) → low (5)
        let breakdown = calculate_breakdown(50.0, "speed", [&low, &add, &high], 0.0);
        assert_eq!(breakdown.override_value, Some(1.0));
        assert_eq!(breakdown.result, 1.0);

        // Final after an Override adds on top of it
        let late_final = single(4, 10, CalculationType::Final, 3.0);
        assert_eq!(calculate(50.0, "speed", [&low, &late_final], 0.0), 4.0);
    }

    #[test]
    fn equal_priority_keeps_creation_order() {
        let first = single(1, 0, CalculationType::Override, 1.0);
        let second = single(2, 0, CalculationType::Override, 2.0);
        assert_eq!(calculate(0.0, "speed", [&second, &first], 0.0), 2.0);
    }

    #[test]
    fn ignores_unrelated_and_discrete_effects() {
        let mut aura = EffectDefinition::custom(TriggerTiming::Continuous, "aura");
        aura.target_property = "speed".into();
        aura.base_value = 99.0;

        let buff = instance(
            1,
            BuffDefinition::new("mixed", 5.0)
                .effect(EffectDefinition::continuous(
                    "attack",
                    CalculationType::Additive,
                    99.0,
                ))
                .effect(EffectDefinition::periodic(EffectType::Add, "speed", 1.0, 99.0))
                .effect(EffectDefinition::triggered(
                    TriggerTiming::OnApply,
                    EffectType::Add,
                    "speed",
                    99.0,
                ))
                .effect(aura)
                .effect(effect(CalculationType::Additive, 1.0)),
        );
        assert_eq!(calculate(10.0, "speed", [&buff], 0.0), 11.0);
    }

    #[test]
    fn inactive_effects_do_not_contribute() {
        let mut buff = single(1, 0, CalculationType::Additive, 5.0);
        buff.effects[0].active = false;
        assert_eq!(calculate(10.0, "speed", [&buff], 0.0), 10.0);
    }

    #[test]
    fn stacks_scale_contributions() {
        let mut buff = instance(
            1,
            BuffDefinition::new("fury", 5.0)
                .stacking(StackRule::Stack, 5)
                .effect(
                    EffectDefinition::continuous("attack", CalculationType::Additive, 10.0)
                        .per_stack(5.0),
                ),
        );
        buff.stack = 5;
        assert_eq!(calculate(100.0, "attack", [&buff], 0.0), 130.0);
    }
}
