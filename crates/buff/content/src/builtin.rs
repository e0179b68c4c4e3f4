//! Catalog compiled into the binary, used when no data directory is given.

use buff_core::{DefinitionRegistry, EngineConfig, LoadReport};

use crate::loaders::{CatalogFormat, CatalogLoader, ConfigLoader, LoadResult};

/// RON source of the built-in catalog.
pub const BUILTIN_CATALOG: &str = include_str!("../data/buffs.ron");

/// TOML source of the built-in engine configuration.
pub const BUILTIN_CONFIG: &str = include_str!("../data/config.toml");

/// Parses [`BUILTIN_CATALOG`].
pub fn builtin_registry() -> LoadResult<(DefinitionRegistry, LoadReport)> {
    CatalogLoader::parse(BUILTIN_CATALOG, CatalogFormat::Ron)
}

/// Parses [`BUILTIN_CONFIG`].
pub fn builtin_config() -> LoadResult<EngineConfig> {
    ConfigLoader::parse(BUILTIN_CONFIG)
}

#[cfg(test)]
mod tests {
    use buff_core::{ApplyOptions, BuffEngine, BuffTarget, EntityId};

    use super::*;

    #[test]
    fn builtin_content_is_clean() {
        let (registry, report) = builtin_registry().expect("built-in catalog parses");
        assert!(report.is_clean(), "skipped: {:?}", report.skipped);
        for id in ["battle_fury", "haste", "regeneration", "poison", "stone_skin"] {
            assert!(registry.contains(id), "missing {id}");
        }
        builtin_config().expect("built-in config parses");
    }

    struct Fighter {
        hp: f64,
    }

    impl BuffTarget for Fighter {
        fn entity_id(&self) -> EntityId {
            EntityId(1)
        }

        fn property(&self, name: &str) -> f64 {
            if name == "hp" { self.hp } else { 0.0 }
        }

        fn set_property(&mut self, name: &str, value: f64) {
            if name == "hp" {
                self.hp = value;
            }
        }
    }

    #[test]
    fn last_stand_revives_downed_unit() {
        let (registry, _) = builtin_registry().expect("built-in catalog parses");
        let mut engine = BuffEngine::new(registry);
        let mut fighter = Fighter { hp: 40.0 };
        engine
            .apply_buff("last_stand", &mut fighter, ApplyOptions::default())
            .expect("last_stand applies");
        assert_eq!(fighter.hp, 40.0);

        fighter.hp = -12.0;
        assert_eq!(engine.notify_condition(&mut fighter, "near_death"), 1);
        assert_eq!(fighter.hp, 1.0);
        assert_eq!(engine.active_buffs(EntityId(1)).len(), 1);
    }
}
