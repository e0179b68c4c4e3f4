//! Contract implemented by entities that can carry buffs.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::instance::{BuffInstance, EntityId};

/// An entity buffs can be applied to.
///
/// The engine depends only on this trait, never on concrete entity types.
pub trait BuffTarget {
    /// Stable identifier of this entity.
    fn entity_id(&self) -> EntityId;

    /// Base (unbuffed) value of a property. Unknown properties read as 0.
    fn property(&self, name: &str) -> f64;

    /// Writes a base property value. Used by mutating triggers.
    fn set_property(&mut self, name: &str, value: f64);

    /// Whether this entity currently accepts buffs at all.
    fn accepts_buffs(&self) -> bool {
        true
    }

    /// Observational hook, called after an instance is created.
    fn on_buff_applied(&mut self, _instance: &BuffInstance) {}

    /// Observational hook, called after an instance is removed.
    fn on_buff_removed(&mut self, _instance: &BuffInstance) {}
}

/// Resolves entity ids to targets for world-wide operations such as
/// [`crate::BuffEngine::tick`].
pub trait TargetLookup {
    fn target_mut(&mut self, id: EntityId) -> Option<&mut dyn BuffTarget>;
}

impl<T: BuffTarget, S: BuildHasher> TargetLookup for HashMap<EntityId, T, S> {
    fn target_mut(&mut self, id: EntityId) -> Option<&mut dyn BuffTarget> {
        self.get_mut(&id).map(|t| t as &mut dyn BuffTarget)
    }
}

impl<T: BuffTarget> TargetLookup for BTreeMap<EntityId, T> {
    fn target_mut(&mut self, id: EntityId) -> Option<&mut dyn BuffTarget> {
        self.get_mut(&id).map(|t| t as &mut dyn BuffTarget)
    }
}

/// Linear scan by [`BuffTarget::entity_id`].
impl<T: BuffTarget> TargetLookup for Vec<T> {
    fn target_mut(&mut self, id: EntityId) -> Option<&mut dyn BuffTarget> {
        self.iter_mut()
            .find(|t| t.entity_id() == id)
            .map(|t| t as &mut dyn BuffTarget)
    }
}

/// A single target is its own lookup.
impl TargetLookup for dyn BuffTarget + '_ {
    fn target_mut(&mut self, id: EntityId) -> Option<&mut dyn BuffTarget> {
        if self.entity_id() == id { Some(self) } else { None }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Dummy;
    use super::*;

    #[test]
    fn lookups_resolve_by_id() {
        let mut map: HashMap<EntityId, Dummy> = HashMap::new();
        map.insert(EntityId(1), Dummy::new(1).with("hp", 10.0));
        let found = map.target_mut(EntityId(1)).expect("present");
        assert_eq!(found.property("hp"), 10.0);
        assert!(map.target_mut(EntityId(2)).is_none());

        let mut list = vec![Dummy::new(4), Dummy::new(9)];
        assert_eq!(
            list.target_mut(EntityId(9)).map(|t| t.entity_id()),
            Some(EntityId(9))
        );
    }

    #[test]
    fn single_target_lookup() {
        let mut dummy = Dummy::new(5);
        let target: &mut dyn BuffTarget = &mut dummy;
        assert!(target.target_mut(EntityId(5)).is_some());
        assert!(target.target_mut(EntityId(6)).is_none());
    }
}
