//! Effect trigger runner: fires discrete, mutating effects against a target.
//!
//! Continuous effects are never fired here; they are read-only inputs to
//! [`crate::calculator`].

use std::collections::HashMap;
use std::fmt;

use crate::definition::{BuffDefinition, EffectDefinition, EffectType, TriggerTiming, ValueType};
use crate::engine::CommandQueue;
use crate::instance::{BuffInstance, InstanceId, StateBag, magnitude};
use crate::target::BuffTarget;

/// Everything a Custom handler may see and touch for one firing.
pub struct CustomEffectContext<'a> {
    pub instance_id: InstanceId,
    pub definition: &'a BuffDefinition,
    pub effect: &'a EffectDefinition,
    pub timing: TriggerTiming,
    pub stack: u32,
    /// Magnitude computed for this firing.
    pub magnitude: f64,
    /// Engine clock.
    pub now: f64,
    /// State bag of the firing effect instance.
    pub state: &'a mut StateBag,
    /// State bag shared by every effect of the buff instance.
    pub instance_state: &'a mut StateBag,
    /// Active flag of the firing effect instance.
    pub active: &'a mut bool,
    pub target: &'a mut dyn BuffTarget,
    pub commands: &'a mut CommandQueue,
}

/// Pluggable behaviour for [`EffectType::Custom`] effects.
pub trait CustomEffectHandler {
    fn handle(&mut self, ctx: &mut CustomEffectContext<'_>);
}

impl<F> CustomEffectHandler for F
where
    F: FnMut(&mut CustomEffectContext<'_>),
{
    fn handle(&mut self, ctx: &mut CustomEffectContext<'_>) {
        self(ctx)
    }
}

/// New property value after applying `effect_type` with `magnitude`.
///
/// Returns `None` for [`EffectType::Custom`], which has no built-in
/// arithmetic.
pub fn mutate(
    effect_type: EffectType,
    value_type: ValueType,
    current: f64,
    magnitude: f64,
) -> Option<f64> {
    Some(match effect_type {
        EffectType::Add if value_type == ValueType::Percentage => {
            current + current * magnitude / 100.0
        }
        EffectType::Add => current + magnitude,
        EffectType::Multiply => current * magnitude,
        EffectType::Set => magnitude,
        EffectType::PercentIncrease => current * (1.0 + magnitude / 100.0),
        EffectType::PercentDecrease => current * (1.0 - magnitude / 100.0),
        EffectType::Custom => return None,
    })
}

/// Fires effects and dispatches Custom handlers.
#[derive(Default)]
pub struct TriggerRunner {
    handlers: HashMap<String, Box<dyn CustomEffectHandler>>,
}

impl fmt::Debug for TriggerRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().collect();
        keys.sort();
        f.debug_struct("TriggerRunner").field("handlers", &keys).finish()
    }
}

impl TriggerRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for `key`, replacing any previous one.
    pub fn register<H>(&mut self, key: impl Into<String>, handler: H)
    where
        H: CustomEffectHandler + 'static,
    {
        self.handlers.insert(key.into(), Box::new(handler));
    }

    pub fn has_handler(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    /// Fires every active effect of `instance` with the given timing.
    ///
    /// Intended for OnApply and OnRemove. Returns the number of effects fired.
    pub fn fire_timing(
        &mut self,
        instance: &mut BuffInstance,
        timing: TriggerTiming,
        now: f64,
        target: &mut dyn BuffTarget,
        commands: &mut CommandQueue,
    ) -> usize {
        self.fire_where(instance, now, target, commands, |effect| {
            effect.trigger_timing == timing
        })
    }

    /// Fires active OnEvent effects listening for `event`.
    pub fn fire_event(
        &mut self,
        instance: &mut BuffInstance,
        event: &str,
        now: f64,
        target: &mut dyn BuffTarget,
        commands: &mut CommandQueue,
    ) -> usize {
        self.fire_where(instance, now, target, commands, |effect| {
            effect.trigger_timing == TriggerTiming::OnEvent
                && effect.event_name.as_deref() == Some(event)
        })
    }

    /// Fires active OnCondition effects watching `condition`.
    pub fn fire_condition(
        &mut self,
        instance: &mut BuffInstance,
        condition: &str,
        now: f64,
        target: &mut dyn BuffTarget,
        commands: &mut CommandQueue,
    ) -> usize {
        self.fire_where(instance, now, target, commands, |effect| {
            effect.trigger_timing == TriggerTiming::OnCondition
                && effect.condition.as_deref() == Some(condition)
        })
    }

    /// Advances Periodic countdowns by `delta` and fires the ones that came
    /// due.
    ///
    /// Each effect fires at most once per call. Whole intervals skipped by a
    /// large `delta` are dropped; the fractional remainder carries forward so
    /// the firing phase is preserved.
    pub fn advance_periodic(
        &mut self,
        instance: &mut BuffInstance,
        delta: f64,
        now: f64,
        target: &mut dyn BuffTarget,
        commands: &mut CommandQueue,
    ) -> usize {
        let mut fired = 0;
        for index in 0..instance.effects.len() {
            let definition = &instance.definition.effects[index];
            if definition.trigger_timing != TriggerTiming::Periodic
                || !instance.effects[index].active
            {
                continue;
            }

            let interval = definition.trigger_interval;
            let effect = &mut instance.effects[index];
            effect.next_trigger_time -= delta;
            if effect.next_trigger_time > 0.0 {
                continue;
            }

            let overshoot = -effect.next_trigger_time;
            effect.next_trigger_time = interval - overshoot % interval;

            tracing::debug!(
                buff = %instance.definition.id,
                instance = %instance.id,
                effect = index,
                "periodic effect fired"
            );
            self.fire_effect(instance, index, now, target, commands);
            fired += 1;
        }
        fired
    }

    fn fire_where(
        &mut self,
        instance: &mut BuffInstance,
        now: f64,
        target: &mut dyn BuffTarget,
        commands: &mut CommandQueue,
        matches: impl Fn(&EffectDefinition) -> bool,
    ) -> usize {
        let mut fired = 0;
        for index in 0..instance.effects.len() {
            if instance.effects[index].active && matches(&instance.definition.effects[index]) {
                self.fire_effect(instance, index, now, target, commands);
                fired += 1;
            }
        }
        fired
    }

    /// Fires one effect unconditionally.
    pub fn fire_effect(
        &mut self,
        instance: &mut BuffInstance,
        index: usize,
        now: f64,
        target: &mut dyn BuffTarget,
        commands: &mut CommandQueue,
    ) {
        let definition = instance.definition.clone();
        let Some(effect) = definition.effects.get(index) else {
            return;
        };
        if !effect.trigger_timing.is_discrete() {
            return;
        }

        let amount = magnitude(instance, effect, now);
        instance.effects[index].last_trigger_time = Some(now);

        if let Some(value) = mutate(
            effect.effect_type,
            effect.value_type,
            target.property(&effect.target_property),
            amount,
        ) {
            target.set_property(&effect.target_property, value);
            return;
        }

        let key = effect.handler_key();
        let Some(handler) = self.handlers.get_mut(key) else {
            tracing::warn!(
                buff = %definition.id,
                handler = key,
                "no custom effect handler registered; skipping"
            );
            return;
        };

        let stack = instance.stack;
        let effect_instance = &mut instance.effects[index];
        let mut ctx = CustomEffectContext {
            instance_id: instance.id,
            definition: &definition,
            effect,
            timing: effect.trigger_timing,
            stack,
            magnitude: amount,
            now,
            state: &mut effect_instance.state,
            instance_state: &mut instance.state,
            active: &mut effect_instance.active,
            target,
            commands,
        };
        handler.handle(&mut ctx);
    }
}
