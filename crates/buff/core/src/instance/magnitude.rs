//! Per-instance effect magnitude.

use crate::definition::EffectDefinition;
use crate::formula::{Formula, FormulaContext};

use super::BuffInstance;

/// Builds the formula context for `effect` on `instance` at engine time `now`.
pub fn formula_context(
    instance: &BuffInstance,
    effect: &EffectDefinition,
    now: f64,
) -> FormulaContext {
    FormulaContext {
        stack: f64::from(instance.stack),
        max_stack: f64::from(instance.definition.max_stack),
        remaining_time: instance.remaining_time,
        total_duration: instance.total_duration,
        elapsed: (now - instance.created_at).max(0.0),
        potency: instance.potency,
        base_value: effect.base_value,
        per_stack_value: effect.per_stack_value,
    }
}

/// Current magnitude of `effect` on `instance`.
///
/// With a formula, the formula result is returned as-is (it can reference
/// `potency` itself). Evaluation errors are logged and count as 0; the buff
/// stays active. Without a formula the magnitude is
/// `(base_value + per_stack_value * (stack - 1)) * potency`.
pub fn magnitude(instance: &BuffInstance, effect: &EffectDefinition, now: f64) -> f64 {
    let Some(source) = effect.formula.as_deref() else {
        let stacks = f64::from(instance.stack.saturating_sub(1));
        return (effect.base_value + effect.per_stack_value * stacks) * instance.potency;
    };

    let ctx = formula_context(instance, effect, now);
    let result = match effect.compiled_formula() {
        Some(formula) => formula.evaluate(&ctx),
        None => Formula::parse(source).and_then(|formula| formula.evaluate(&ctx)),
    };

    result.unwrap_or_else(|error| {
        tracing::warn!(
            buff = %instance.definition.id,
            instance = %instance.id,
            formula = source,
            %error,
            "formula evaluation failed; using 0"
        );
        0.0
    })
}
