//! Stacking resolution for reapplied buffs.

use std::sync::Arc;

use crate::definition::{BuffDefinition, StackRule};
use crate::instance::InstanceId;
use crate::target::BuffTarget;

use super::{ApplyOptions, ApplyOutcome, BuffEngine, BuffEvent, UnchangedReason};

impl BuffEngine {
    /// Resolves a reapplication of `definition` onto the live `existing`
    /// instance according to the definition's stack rule.
    pub(super) fn resolve_stacking(
        &mut self,
        existing: InstanceId,
        definition: Arc<BuffDefinition>,
        target: &mut dyn BuffTarget,
        options: &ApplyOptions,
    ) -> ApplyOutcome {
        let duration = options.resolved_duration(&definition);
        let clock = self.clock;
        let Some(instance) = self.store.get_mut(existing) else {
            return ApplyOutcome::Created(self.create_instance(definition, target, options));
        };

        let rule = definition.stack_rule;
        match rule {
            StackRule::None => {
                tracing::debug!(
                    buff = %definition.id,
                    instance = %existing,
                    "reapplication ignored"
                );
                ApplyOutcome::Unchanged {
                    instance: existing,
                    reason: UnchangedReason::RuleNone,
                }
            }

            StackRule::Replace => self.replace(existing, definition, target, options),

            StackRule::Refresh => {
                instance.total_duration = duration;
                instance.remaining_time = duration;
                instance.last_updated = clock;
                tracing::debug!(
                    buff = %definition.id,
                    instance = %existing,
                    duration,
                    "buff refreshed"
                );
                ApplyOutcome::Refreshed(existing)
            }

            StackRule::Stack => {
                if instance.stack >= instance.definition.max_stack {
                    tracing::debug!(
                        buff = %definition.id,
                        instance = %existing,
                        stack = instance.stack,
                        "stack cap reached"
                    );
                    return ApplyOutcome::Unchanged {
                        instance: existing,
                        reason: UnchangedReason::StackCapReached,
                    };
                }

                instance.stack += 1;
                instance.last_updated = clock;
                let new_stack = instance.stack;
                tracing::debug!(
                    buff = %definition.id,
                    instance = %existing,
                    new_stack,
                    "buff stacked"
                );

                let snapshot = instance.clone();
                self.emit(BuffEvent::Stacked {
                    instance: snapshot,
                    new_stack,
                });
                ApplyOutcome::Stacked {
                    instance: existing,
                    stack: new_stack,
                }
            }

            StackRule::Extend => {
                instance.total_duration += duration;
                instance.remaining_time += duration;
                instance.last_updated = clock;
                tracing::debug!(
                    buff = %definition.id,
                    instance = %existing,
                    remaining = instance.remaining_time,
                    "buff extended"
                );
                ApplyOutcome::Extended(existing)
            }

            StackRule::Strongest => {
                let potency = options.resolved_potency(&definition);
                let stronger = potency > instance.potency
                    || (potency == instance.potency && duration > instance.remaining_time);
                if !stronger {
                    tracing::debug!(
                        buff = %definition.id,
                        instance = %existing,
                        "weaker application discarded"
                    );
                    return ApplyOutcome::Unchanged {
                        instance: existing,
                        reason: UnchangedReason::WeakerApplication,
                    };
                }
                self.replace(existing, definition, target, options)
            }
        }
    }

    /// Removes `existing` (OnRemove, `Removed`) and creates a fresh instance
    /// (OnApply, `Applied`).
    fn replace(
        &mut self,
        existing: InstanceId,
        definition: Arc<BuffDefinition>,
        target: &mut dyn BuffTarget,
        options: &ApplyOptions,
    ) -> ApplyOutcome {
        self.remove_instance(existing, Some(&mut *target));
        let new = self.create_instance(definition, target, options);
        tracing::debug!(old = %existing, %new, "buff replaced");
        ApplyOutcome::Replaced { old: existing, new }
    }
}
