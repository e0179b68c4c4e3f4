//! Buff engine: applies, stacks, ticks and removes buff instances.
//!
//! The engine exclusively owns the [`InstanceStore`]. Callers read through
//! queries and the property calculator, and request mutation through
//! [`BuffEngine::apply_buff`], [`BuffEngine::remove_buff`] and
//! [`BuffEngine::tick`]. Mutations requested while the engine is notifying
//! listeners or running Custom handlers go through the [`CommandQueue`] and
//! run at the start of the next tick.

mod commands;
mod events;
mod outcome;
mod stacking;

pub use commands::{BuffCommand, CommandQueue};
pub use events::{BuffEvent, BuffListener, EventRecorder};
pub use outcome::{ApplyOptions, ApplyOutcome, RemoveOutcome, UnchangedReason};

use std::fmt;
use std::sync::Arc;

use crate::calculator::{self, PropertyBreakdown};
use crate::config::EngineConfig;
use crate::definition::{BuffDefinition, BuffKind, DefinitionRegistry, TriggerTiming};
use crate::error::BuffError;
use crate::instance::{BuffInstance, EntityId, InstanceId, InstanceStore};
use crate::target::{BuffTarget, TargetLookup};
use crate::trigger::{CustomEffectHandler, TriggerRunner};

/// Orchestrates buff lifecycles for any number of targets.
pub struct BuffEngine {
    registry: Arc<DefinitionRegistry>,
    store: InstanceStore,
    runner: TriggerRunner,
    listeners: Vec<Box<dyn BuffListener>>,
    commands: CommandQueue,
    config: EngineConfig,
    /// Seconds of simulated time since construction.
    clock: f64,
}

impl fmt::Debug for BuffEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuffEngine")
            .field("definitions", &self.registry.len())
            .field("instances", &self.store.len())
            .field("listeners", &self.listeners.len())
            .field("pending_commands", &self.commands.len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl BuffEngine {
    /// Creates an engine with the default configuration.
    pub fn new(registry: impl Into<Arc<DefinitionRegistry>>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    pub fn with_config(registry: impl Into<Arc<DefinitionRegistry>>, config: EngineConfig) -> Self {
        Self {
            registry: registry.into(),
            store: InstanceStore::new(config.first_instance_id),
            runner: TriggerRunner::new(),
            listeners: Vec::new(),
            commands: CommandQueue::new(config.max_pending_commands),
            config,
            clock: 0.0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    /// Swaps in a new registry.
    ///
    /// Live instances keep the definition they were created from; only new
    /// applications see the new templates.
    pub fn reload_registry(&mut self, registry: impl Into<Arc<DefinitionRegistry>>) {
        self.registry = registry.into();
        tracing::debug!(definitions = self.registry.len(), "buff registry reloaded");
    }

    /// Registers a Custom effect handler under `key`.
    pub fn register_handler<H>(&mut self, key: impl Into<String>, handler: H)
    where
        H: CustomEffectHandler + 'static,
    {
        self.runner.register(key, handler);
    }

    /// Adds a lifecycle listener. Listeners are notified in registration order.
    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: BuffListener + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Queues a command for the next tick.
    pub fn queue_command(&mut self, command: BuffCommand) -> bool {
        self.commands.push(command)
    }

    pub fn pending_commands(&self) -> &CommandQueue {
        &self.commands
    }

    // ========================================================================
    // Apply / remove
    // ========================================================================

    /// Applies `definition_id` to `target`.
    ///
    /// If the target already carries the definition, the definition's stack
    /// rule decides the outcome instead of creating a duplicate. A rejected
    /// application leaves no trace.
    pub fn apply_buff(
        &mut self,
        definition_id: &str,
        target: &mut dyn BuffTarget,
        options: ApplyOptions,
    ) -> Result<ApplyOutcome, BuffError> {
        let definition = self
            .registry
            .get(definition_id)
            .ok_or_else(|| BuffError::DefinitionNotFound {
                id: definition_id.to_string(),
            })?;

        let entity = target.entity_id();
        if !target.accepts_buffs() {
            return Err(BuffError::InvalidTarget { target: entity });
        }

        if let Some(existing) = self.store.find(entity, definition_id) {
            return Ok(self.resolve_stacking(existing, definition, target, &options));
        }

        if let Some(limit) = self.config.max_instances_per_target {
            if self.store.count_for(entity) >= limit {
                return Err(BuffError::TargetSaturated {
                    target: entity,
                    limit,
                });
            }
        }

        Ok(ApplyOutcome::Created(
            self.create_instance(definition, target, &options),
        ))
    }

    /// Creates, indexes and announces a fresh instance.
    fn create_instance(
        &mut self,
        definition: Arc<BuffDefinition>,
        target: &mut dyn BuffTarget,
        options: &ApplyOptions,
    ) -> InstanceId {
        let id = self.store.allocate_id();
        let duration = options.resolved_duration(&definition);
        let potency = options.resolved_potency(&definition);
        let instance = BuffInstance::new(
            id,
            definition,
            target.entity_id(),
            options.source,
            duration,
            potency,
            self.clock,
        );
        self.store.insert(instance);

        let Some(instance) = self.store.get_mut(id) else {
            return id;
        };
        self.runner.fire_timing(
            instance,
            TriggerTiming::OnApply,
            self.clock,
            target,
            &mut self.commands,
        );
        target.on_buff_applied(instance);

        tracing::debug!(
            buff = %instance.definition.id,
            instance = %id,
            target = %instance.target,
            duration,
            potency,
            "buff applied"
        );
        let snapshot = instance.clone();
        self.emit(BuffEvent::Applied(snapshot));
        id
    }

    /// Removes one instance from `target`.
    ///
    /// Unknown ids, and ids that belong to a different target, report
    /// [`RemoveOutcome::NotFound`]; removing twice is harmless.
    pub fn remove_buff(&mut self, id: InstanceId, target: &mut dyn BuffTarget) -> RemoveOutcome {
        match self.store.get(id) {
            Some(instance) if instance.target == target.entity_id() => {}
            Some(instance) => {
                tracing::warn!(
                    instance = %id,
                    owner = %instance.target,
                    target = %target.entity_id(),
                    "remove requested for an instance on another target"
                );
                return RemoveOutcome::NotFound;
            }
            None => {
                tracing::debug!(instance = %id, "remove requested for unknown instance");
                return RemoveOutcome::NotFound;
            }
        }

        match self.remove_instance(id, Some(target)) {
            Some(_) => RemoveOutcome::Removed,
            None => RemoveOutcome::NotFound,
        }
    }

    /// Fires OnRemove, drops the instance from both indices, emits `Removed`.
    ///
    /// With no target (entity gone from the world) OnRemove effects and hooks
    /// are skipped but the instance is still removed.
    fn remove_instance(
        &mut self,
        id: InstanceId,
        mut target: Option<&mut (dyn BuffTarget + '_)>,
    ) -> Option<BuffInstance> {
        let instance = self.store.get_mut(id)?;
        if let Some(target) = target.as_deref_mut() {
            self.runner.fire_timing(
                instance,
                TriggerTiming::OnRemove,
                self.clock,
                target,
                &mut self.commands,
            );
        }

        let instance = self.store.remove(id)?;
        if let Some(target) = target.as_deref_mut() {
            target.on_buff_removed(&instance);
        }

        tracing::debug!(
            buff = %instance.definition.id,
            instance = %id,
            target = %instance.target,
            "buff removed"
        );
        self.emit(BuffEvent::Removed(instance.clone()));
        Some(instance)
    }

    /// Removes every instance on `target` matching `predicate`.
    fn remove_where(
        &mut self,
        target: &mut dyn BuffTarget,
        predicate: impl Fn(&BuffInstance) -> bool,
    ) -> usize {
        let ids: Vec<InstanceId> = self
            .store
            .for_target(target.entity_id())
            .filter(|instance| predicate(*instance))
            .map(BuffInstance::id)
            .collect();

        let mut removed = 0;
        for id in ids {
            if self.remove_instance(id, Some(&mut *target)).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Removes every instance of `kind` on `target`, dispellable or not.
    ///
    /// Returns whether anything was removed.
    pub fn remove_buffs_by_kind(&mut self, target: &mut dyn BuffTarget, kind: BuffKind) -> bool {
        self.remove_where(target, |instance| instance.definition.kind == kind) > 0
    }

    /// Removes every dispellable instance of `kind`. Returns the count.
    pub fn dispel(&mut self, target: &mut dyn BuffTarget, kind: BuffKind) -> usize {
        self.remove_where(target, |instance| {
            instance.definition.kind == kind && instance.definition.dispellable
        })
    }

    /// Removes every instance whose definition carries `tag`.
    pub fn remove_buffs_by_tag(&mut self, target: &mut dyn BuffTarget, tag: &str) -> usize {
        self.remove_where(target, |instance| instance.definition.has_tag(tag))
    }

    /// Removes everything from `target`, e.g. when the entity despawns.
    pub fn clear_target(&mut self, target: &mut dyn BuffTarget) -> usize {
        self.remove_where(target, |_| true)
    }

    // ========================================================================
    // Time and external triggers
    // ========================================================================

    /// Advances simulated time by `delta` seconds.
    ///
    /// Runs queued commands first, then sweeps every instance: countdown
    /// (skipped for persistent buffs) and Periodic effects. After the sweep,
    /// expired instances are removed and announced with `Removed` followed
    /// by `Expired`.
    pub fn tick<L>(&mut self, delta: f64, targets: &mut L)
    where
        L: TargetLookup + ?Sized,
    {
        if !(delta.is_finite() && delta >= 0.0) {
            tracing::warn!(delta, "ignoring tick with invalid delta");
            return;
        }

        self.flush_commands(targets);
        self.clock += delta;

        let ids: Vec<InstanceId> = self.store.iter().map(BuffInstance::id).collect();
        for id in ids {
            let Some(instance) = self.store.get_mut(id) else {
                continue;
            };
            if !instance.definition.persistent {
                instance.remaining_time = (instance.remaining_time - delta).max(0.0);
            }
            instance.last_updated = self.clock;

            match targets.target_mut(instance.target) {
                Some(target) => {
                    self.runner.advance_periodic(
                        instance,
                        delta,
                        self.clock,
                        target,
                        &mut self.commands,
                    );
                }
                None => {
                    tracing::trace!(
                        instance = %id,
                        target = %instance.target,
                        "target not found; periodic effects skipped"
                    );
                }
            }
        }

        let expired: Vec<(InstanceId, EntityId)> = self
            .store
            .iter()
            .filter(|instance| instance.is_expired())
            .map(|instance| (instance.id, instance.target))
            .collect();

        for (id, entity) in expired {
            let target = targets.target_mut(entity);
            if target.is_none() {
                tracing::warn!(instance = %id, target = %entity, "expiring buff on missing target");
            }
            if let Some(instance) = self.remove_instance(id, target) {
                tracing::debug!(buff = %instance.definition.id, instance = %id, "buff expired");
                self.emit(BuffEvent::Expired(instance));
            }
        }
    }

    /// Executes every queued command now.
    ///
    /// Commands queued while these run wait for the next flush.
    pub fn flush_commands<L>(&mut self, targets: &mut L)
    where
        L: TargetLookup + ?Sized,
    {
        for command in self.commands.take() {
            self.execute(command, targets);
        }
    }

    fn execute<L>(&mut self, command: BuffCommand, targets: &mut L)
    where
        L: TargetLookup + ?Sized,
    {
        let entity = match &command {
            BuffCommand::Remove { instance } => self.store.get(*instance).map(|i| i.target),
            other => other.target(),
        };
        let target = match entity {
            Some(entity) => targets.target_mut(entity),
            None => None,
        };
        let Some(target) = target else {
            tracing::warn!(?command, "dropping command: target not found");
            return;
        };

        match command {
            BuffCommand::Apply {
                definition_id,
                options,
                ..
            } => {
                if let Err(error) = self.apply_buff(&definition_id, target, options) {
                    tracing::warn!(%error, buff = %definition_id, "deferred apply rejected");
                }
            }
            BuffCommand::Remove { instance } => {
                self.remove_buff(instance, target);
            }
            BuffCommand::RemoveByKind { kind, .. } => {
                self.remove_buffs_by_kind(target, kind);
            }
            BuffCommand::NotifyEvent { event, .. } => {
                self.notify_event(target, &event);
            }
        }
    }

    /// Reports an external event on `target`; matching OnEvent effects fire
    /// once each. Returns the number of effects fired.
    pub fn notify_event(&mut self, target: &mut dyn BuffTarget, event: &str) -> usize {
        let mut fired = 0;
        for id in self.store.ids_for(target.entity_id()) {
            if let Some(instance) = self.store.get_mut(id) {
                fired += self.runner.fire_event(
                    instance,
                    event,
                    self.clock,
                    target,
                    &mut self.commands,
                );
            }
        }
        fired
    }

    /// Reports that `condition` holds on `target`; matching OnCondition
    /// effects fire once each. Returns the number of effects fired.
    pub fn notify_condition(&mut self, target: &mut dyn BuffTarget, condition: &str) -> usize {
        let mut fired = 0;
        for id in self.store.ids_for(target.entity_id()) {
            if let Some(instance) = self.store.get_mut(id) {
                fired += self.runner.fire_condition(
                    instance,
                    condition,
                    self.clock,
                    target,
                    &mut self.commands,
                );
            }
        }
        fired
    }

    fn emit(&mut self, event: BuffEvent) {
        tracing::trace!(event = event.name(), instance = %event.instance_id(), "emitting");
        for listener in &mut self.listeners {
            listener.on_event(&event, &mut self.commands);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Snapshot of the instances on `target`, ordered by priority then
    /// creation.
    pub fn active_buffs(&self, target: EntityId) -> Vec<BuffInstance> {
        let mut buffs: Vec<BuffInstance> = self.store.for_target(target).cloned().collect();
        buffs.sort_by_key(|instance| (instance.definition.priority, instance.id));
        buffs
    }

    pub fn instance(&self, id: InstanceId) -> Option<&BuffInstance> {
        self.store.get(id)
    }

    pub fn find_instance(&self, target: EntityId, definition_id: &str) -> Option<&BuffInstance> {
        self.store
            .find(target, definition_id)
            .and_then(|id| self.store.get(id))
    }

    pub fn has_buff(&self, target: EntityId, definition_id: &str) -> bool {
        self.store.find(target, definition_id).is_some()
    }

    /// Current stack count, 0 if the buff is not active.
    pub fn stack_count(&self, target: EntityId, definition_id: &str) -> u32 {
        self.find_instance(target, definition_id)
            .map_or(0, BuffInstance::stack)
    }

    /// Total live instances across all targets.
    pub fn instance_count(&self) -> usize {
        self.store.len()
    }

    /// Simulated seconds since construction.
    pub fn elapsed(&self) -> f64 {
        self.clock
    }

    /// Read-only view of the instance store.
    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    /// Effective value of `property` on `target`.
    pub fn calculate(&self, target: &dyn BuffTarget, property: &str) -> f64 {
        calculator::calculate(
            target.property(property),
            property,
            self.store.for_target(target.entity_id()),
            self.clock,
        )
    }

    /// Like [`Self::calculate`], with every intermediate value.
    pub fn calculate_breakdown(
        &self,
        target: &dyn BuffTarget,
        property: &str,
    ) -> PropertyBreakdown {
        calculator::calculate_breakdown(
            target.property(property),
            property,
            self.store.for_target(target.entity_id()),
            self.clock,
        )
    }
}
