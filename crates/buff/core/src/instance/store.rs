use std::collections::BTreeMap;

use super::{BuffInstance, EntityId, InstanceId};

/// Global instance index plus a per-target collection.
///
/// Both indices are updated together; a per-target list keeps instances in
/// insertion order.
#[derive(Clone, Debug)]
pub struct InstanceStore {
    instances: BTreeMap<InstanceId, BuffInstance>,
    by_target: BTreeMap<EntityId, Vec<InstanceId>>,
    next_id: u64,
}

impl Default for InstanceStore {
    fn default() -> Self {
        Self::new(1)
    }
}

impl InstanceStore {
    pub fn new(first_id: u64) -> Self {
        Self {
            instances: BTreeMap::new(),
            by_target: BTreeMap::new(),
            next_id: first_id,
        }
    }

    /// Reserves the next instance id.
    pub(crate) fn allocate_id(&mut self) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, instance: BuffInstance) {
        debug_assert!(
            self.find(instance.target, instance.definition_id()).is_none(),
            "duplicate instance of {} on {}",
            instance.definition_id(),
            instance.target
        );
        self.by_target
            .entry(instance.target)
            .or_default()
            .push(instance.id);
        self.instances.insert(instance.id, instance);
    }

    pub(crate) fn remove(&mut self, id: InstanceId) -> Option<BuffInstance> {
        let instance = self.instances.remove(&id)?;
        if let Some(ids) = self.by_target.get_mut(&instance.target) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_target.remove(&instance.target);
            }
        }
        Some(instance)
    }

    pub fn get(&self, id: InstanceId) -> Option<&BuffInstance> {
        self.instances.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: InstanceId) -> Option<&mut BuffInstance> {
        self.instances.get_mut(&id)
    }

    /// The instance of `definition_id` on `target`, if any.
    pub fn find(&self, target: EntityId, definition_id: &str) -> Option<InstanceId> {
        self.for_target(target)
            .find(|instance| instance.definition_id() == definition_id)
            .map(BuffInstance::id)
    }

    /// Instances on `target` in insertion order.
    pub fn for_target(&self, target: EntityId) -> impl Iterator<Item = &BuffInstance> {
        self.by_target
            .get(&target)
            .into_iter()
            .flatten()
            .filter_map(|id| self.instances.get(id))
    }

    /// Snapshot of the instance ids on `target` in insertion order.
    pub fn ids_for(&self, target: EntityId) -> Vec<InstanceId> {
        self.by_target.get(&target).cloned().unwrap_or_default()
    }

    pub fn count_for(&self, target: EntityId) -> usize {
        self.by_target.get(&target).map_or(0, Vec::len)
    }

    /// Targets carrying at least one instance.
    pub fn targets(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.by_target.keys().copied()
    }

    /// Every instance in id (creation) order.
    pub fn iter(&self) -> impl Iterator<Item = &BuffInstance> {
        self.instances.values()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::definition::BuffDefinition;

    fn push(store: &mut InstanceStore, def: &str, target: u32) -> InstanceId {
        let id = store.allocate_id();
        let definition = Arc::new(BuffDefinition::new(def, 5.0));
        store.insert(BuffInstance::new(
            id,
            definition,
            EntityId(target),
            None,
            5.0,
            1.0,
            0.0,
        ));
        id
    }

    #[test]
    fn indices_stay_in_sync() {
        let mut store = InstanceStore::new(10);
        let a = push(&mut store, "haste", 1);
        let b = push(&mut store, "might", 1);
        let c = push(&mut store, "haste", 2);

        assert_eq!(a, InstanceId(10));
        assert_eq!(store.ids_for(EntityId(1)), vec![a, b]);
        assert_eq!(store.find(EntityId(2), "haste"), Some(c));
        assert_eq!(store.len(), 3);

        let removed = store.remove(a).expect("present");
        assert_eq!(removed.definition_id(), "haste");
        assert_eq!(store.ids_for(EntityId(1)), vec![b]);
        assert!(store.find(EntityId(1), "haste").is_none());
        assert!(store.remove(a).is_none());
    }

    #[test]
    fn empty_targets_are_dropped() {
        let mut store = InstanceStore::default();
        let id = push(&mut store, "haste", 3);
        assert_eq!(store.targets().collect::<Vec<_>>(), vec![EntityId(3)]);
        store.remove(id);
        assert_eq!(store.targets().count(), 0);
        assert_eq!(store.count_for(EntityId(3)), 0);
        assert!(store.is_empty());
    }
}
