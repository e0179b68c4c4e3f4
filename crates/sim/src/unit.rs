//! Simulated combat unit.

use std::collections::BTreeMap;

use buff_core::{BuffInstance, BuffTarget, EntityId};

/// Entity with a name and a bag of base stats.
#[derive(Clone, Debug)]
pub struct Unit {
    pub id: EntityId,
    pub name: String,
    stats: BTreeMap<String, f64>,
}

impl Unit {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: EntityId(id),
            name: name.into(),
            stats: BTreeMap::new(),
        }
    }

    /// Sets a base stat (builder pattern).
    pub fn stat(mut self, name: &str, value: f64) -> Self {
        self.stats.insert(name.to_string(), value);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.property("hp") > 0.0
    }
}

impl BuffTarget for Unit {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn property(&self, name: &str) -> f64 {
        self.stats.get(name).copied().unwrap_or(0.0)
    }

    fn set_property(&mut self, name: &str, value: f64) {
        self.stats.insert(name.to_string(), value);
    }

    fn accepts_buffs(&self) -> bool {
        self.is_alive()
    }

    fn on_buff_applied(&mut self, instance: &BuffInstance) {
        tracing::info!(unit = %self.name, buff = instance.definition_id(), "gains buff");
    }

    fn on_buff_removed(&mut self, instance: &BuffInstance) {
        tracing::info!(unit = %self.name, buff = instance.definition_id(), "loses buff");
    }
}
