//! Runtime buff state.
//!
//! A [`BuffInstance`] is created from a [`BuffDefinition`] when a buff is
//! applied and carries everything that changes while it is active: stack
//! count, countdown, per-effect trigger timers and free-form state.
//!
//! Instances are owned by the engine's [`InstanceStore`]. Callers only ever
//! see shared references or cloned snapshots, so fields are read through
//! accessors.

mod magnitude;
mod store;

pub use magnitude::{formula_context, magnitude};
pub use store::InstanceStore;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::definition::{BuffDefinition, EffectDefinition, TriggerTiming};

/// Identifier of an entity that can carry buffs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier of a live buff instance.
///
/// Ids are handed out monotonically, so ordering by id is creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buff-{}", self.0)
    }
}

/// A value stored in an instance or effect state bag.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl StateValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Free-form per-instance storage for Custom handlers.
pub type StateBag = BTreeMap<String, StateValue>;

/// Runtime mirror of one [`EffectDefinition`].
#[derive(Clone, Debug, PartialEq)]
pub struct EffectInstance {
    pub(crate) index: usize,
    pub(crate) last_trigger_time: Option<f64>,
    /// Countdown to the next Periodic firing.
    pub(crate) next_trigger_time: f64,
    pub(crate) active: bool,
    pub(crate) state: StateBag,
}

impl EffectInstance {
    fn new(index: usize, definition: &EffectDefinition) -> Self {
        let next_trigger_time = if definition.trigger_timing == TriggerTiming::Periodic {
            definition.trigger_interval
        } else {
            0.0
        };
        Self {
            index,
            last_trigger_time: None,
            next_trigger_time,
            active: true,
            state: StateBag::new(),
        }
    }

    /// Position of the mirrored effect in its definition.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Engine clock at the most recent firing.
    pub fn last_trigger_time(&self) -> Option<f64> {
        self.last_trigger_time
    }

    /// Seconds until the next Periodic firing.
    pub fn next_trigger_time(&self) -> f64 {
        self.next_trigger_time
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> &StateBag {
        &self.state
    }
}

/// A live buff on one target.
#[derive(Clone, Debug)]
pub struct BuffInstance {
    pub(crate) id: InstanceId,
    pub(crate) definition: Arc<BuffDefinition>,
    pub(crate) target: EntityId,
    pub(crate) source: Option<EntityId>,
    pub(crate) stack: u32,
    pub(crate) total_duration: f64,
    pub(crate) remaining_time: f64,
    pub(crate) potency: f64,
    pub(crate) created_at: f64,
    pub(crate) last_updated: f64,
    pub(crate) effects: Vec<EffectInstance>,
    pub(crate) state: StateBag,
}

impl BuffInstance {
    /// Creates a fresh instance: one stack, full duration, one effect
    /// instance per effect definition.
    pub(crate) fn new(
        id: InstanceId,
        definition: Arc<BuffDefinition>,
        target: EntityId,
        source: Option<EntityId>,
        duration: f64,
        potency: f64,
        now: f64,
    ) -> Self {
        let effects = definition
            .effects
            .iter()
            .enumerate()
            .map(|(index, effect)| EffectInstance::new(index, effect))
            .collect();

        Self {
            id,
            definition,
            target,
            source,
            stack: 1,
            total_duration: duration,
            remaining_time: duration,
            potency,
            created_at: now,
            last_updated: now,
            effects,
            state: StateBag::new(),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn definition(&self) -> &BuffDefinition {
        &self.definition
    }

    /// Shared handle to the template this instance was created from.
    pub fn definition_arc(&self) -> &Arc<BuffDefinition> {
        &self.definition
    }

    pub fn definition_id(&self) -> &str {
        &self.definition.id
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    /// Caster, kept for provenance only.
    pub fn source(&self) -> Option<EntityId> {
        self.source
    }

    pub fn stack(&self) -> u32 {
        self.stack
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn remaining_time(&self) -> f64 {
        self.remaining_time
    }

    pub fn potency(&self) -> f64 {
        self.potency
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn last_updated(&self) -> f64 {
        self.last_updated
    }

    pub fn is_persistent(&self) -> bool {
        self.definition.persistent
    }

    /// Non-persistent and out of time.
    pub fn is_expired(&self) -> bool {
        !self.definition.persistent && self.remaining_time <= 0.0
    }

    pub fn effect_instances(&self) -> &[EffectInstance] {
        &self.effects
    }

    /// Pairs every effect definition with its runtime mirror.
    pub fn effects(&self) -> impl Iterator<Item = (&EffectDefinition, &EffectInstance)> {
        self.definition.effects.iter().zip(self.effects.iter())
    }

    pub fn state(&self) -> &StateBag {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{CalculationType, EffectType};

    fn definition() -> Arc<BuffDefinition> {
        Arc::new(
            BuffDefinition::new("regen", 8.0)
                .effect(EffectDefinition::continuous(
                    "armor",
                    CalculationType::Additive,
                    2.0,
                ))
                .effect(EffectDefinition::periodic(EffectType::Add, "hp", 2.0, 5.0)),
        )
    }

    #[test]
    fn new_instance_mirrors_effects() {
        let instance = BuffInstance::new(
            InstanceId(7),
            definition(),
            EntityId(1),
            Some(EntityId(2)),
            8.0,
            1.0,
            3.0,
        );

        assert_eq!(instance.stack(), 1);
        assert_eq!(instance.remaining_time(), 8.0);
        assert_eq!(instance.created_at(), 3.0);
        assert_eq!(instance.effect_instances().len(), 2);
        assert_eq!(instance.effect_instances()[0].next_trigger_time(), 0.0);
        assert_eq!(instance.effect_instances()[1].next_trigger_time(), 2.0);
        assert!(instance.effects().all(|(_, e)| e.is_active()));
    }

    #[test]
    fn expiry_ignores_persistent_buffs() {
        let def = Arc::new(BuffDefinition::new("aura", 0.0).persistent());
        let instance = BuffInstance::new(InstanceId(1), def, EntityId(1), None, 0.0, 1.0, 0.0);
        assert!(!instance.is_expired());

        let def = Arc::new(BuffDefinition::new("flash", 0.0));
        let instance = BuffInstance::new(InstanceId(2), def, EntityId(1), None, 0.0, 1.0, 0.0);
        assert!(instance.is_expired());
    }

    #[test]
    fn ids_display() {
        assert_eq!(EntityId(4).to_string(), "#4");
        assert_eq!(InstanceId(12).to_string(), "buff-12");
        assert_eq!(StateValue::from(2.5).as_number(), Some(2.5));
        assert_eq!(StateValue::from("x").as_flag(), None);
    }
}
