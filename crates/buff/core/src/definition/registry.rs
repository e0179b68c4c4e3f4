//! Definition registry: indexes compiled buff definitions by id.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::BuffEngineError;

use super::{BuffDefinition, DefinitionError};

/// Summary of a [`DefinitionRegistry::load`] run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    /// Ids that were indexed, in load order.
    pub loaded: Vec<String>,
    /// Catalog keys that were rejected, with the reason.
    pub skipped: Vec<(String, DefinitionError)>,
}

impl LoadReport {
    /// Returns true if every entry loaded.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Read-only index of buff definitions.
///
/// Definitions are handed out as `Arc`s so live instances keep the exact
/// template they were created from, even across a reload.
#[derive(Clone, Debug, Default)]
pub struct DefinitionRegistry {
    definitions: BTreeMap<String, Arc<BuffDefinition>>,
}

impl DefinitionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from already-constructed definitions.
    ///
    /// Invalid definitions are skipped exactly as in [`Self::load`].
    pub fn from_definitions(definitions: impl IntoIterator<Item = BuffDefinition>) -> Self {
        let mut registry = Self::new();
        registry.load(definitions.into_iter().map(|def| (def.id.clone(), Ok(def))));
        registry
    }

    /// Replaces the registry contents with the given catalog entries.
    ///
    /// Each entry is `(catalog key, parse result)`. An entry whose body has no
    /// id takes the key as its id. Malformed entries are logged and skipped;
    /// they never abort the load.
    pub fn load<I>(&mut self, entries: I) -> LoadReport
    where
        I: IntoIterator<Item = (String, Result<BuffDefinition, DefinitionError>)>,
    {
        self.definitions.clear();
        let mut report = LoadReport::default();

        for (key, parsed) in entries {
            match Self::prepare(&key, parsed) {
                Ok(definition) => {
                    if self.definitions.contains_key(&definition.id) {
                        tracing::warn!(
                            id = %definition.id,
                            "duplicate buff definition; later entry wins"
                        );
                    }
                    report.loaded.push(definition.id.clone());
                    self.definitions
                        .insert(definition.id.clone(), Arc::new(definition));
                }
                Err(error) => {
                    tracing::warn!(
                        key = %key,
                        code = error.error_code(),
                        %error,
                        "skipping malformed buff definition"
                    );
                    report.skipped.push((key, error));
                }
            }
        }

        tracing::debug!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            "buff definitions loaded"
        );
        report
    }

    fn prepare(
        key: &str,
        parsed: Result<BuffDefinition, DefinitionError>,
    ) -> Result<BuffDefinition, DefinitionError> {
        let mut definition = parsed?;
        if definition.id.is_empty() {
            definition.id = key.to_string();
        } else if definition.id != key {
            return Err(DefinitionError::IdMismatch {
                key: key.to_string(),
                body: definition.id,
            });
        }
        if definition.name.is_empty() {
            definition.name = definition.id.clone();
        }
        definition.compile()?;
        Ok(definition)
    }

    /// Validates and adds a single definition, replacing any with the same id.
    pub fn insert(&mut self, mut definition: BuffDefinition) -> Result<(), DefinitionError> {
        definition.compile()?;
        self.definitions
            .insert(definition.id.clone(), Arc::new(definition));
        Ok(())
    }

    /// Looks up a definition. A miss is `None`, never an error.
    pub fn get(&self, id: &str) -> Option<Arc<BuffDefinition>> {
        self.definitions.get(id).cloned()
    }

    /// Returns true if a definition with this id is indexed.
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Returns an iterator over indexed ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Returns the number of indexed definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if no definitions are indexed.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{CalculationType, EffectDefinition};
    use crate::formula::FormulaError;

    fn might() -> BuffDefinition {
        BuffDefinition::new("might", 10.0).effect(EffectDefinition::continuous(
            "attack",
            CalculationType::Additive,
            5.0,
        ))
    }

    #[test]
    fn load_skips_malformed_entries() {
        let mut registry = DefinitionRegistry::new();
        let report = registry.load(vec![
            ("might".to_string(), Ok(might())),
            ("broken".to_string(), Err(DefinitionError::Malformed("bad".into()))),
            (
                "zero".to_string(),
                Ok(BuffDefinition::new("zero", 1.0).stacking(crate::StackRule::Stack, 0)),
            ),
        ]);

        assert_eq!(report.loaded, vec!["might".to_string()]);
        assert_eq!(report.skipped.len(), 2);
        assert!(!report.is_clean());
        assert!(registry.contains("might"));
        assert!(registry.get("broken").is_none());
    }

    #[test]
    fn load_rejects_runaway_formulas() {
        let deep = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        let nested = format!("{}stack{}", "(".repeat(300), ")".repeat(300));
        let formula_effect = |source: &str| {
            EffectDefinition::continuous("attack", CalculationType::Additive, 0.0)
                .with_formula(source)
        };

        let mut registry = DefinitionRegistry::new();
        let report = registry.load(vec![
            ("might".to_string(), Ok(might())),
            (
                "abyss".to_string(),
                Ok(BuffDefinition::new("abyss", 5.0).effect(formula_effect(&deep))),
            ),
            (
                "spiral".to_string(),
                Ok(BuffDefinition::new("spiral", 5.0).effect(formula_effect(&nested))),
            ),
        ]);

        assert_eq!(report.loaded, vec!["might".to_string()]);
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(
            report.skipped[0].1,
            DefinitionError::Formula {
                source: FormulaError::TooLong { .. },
                ..
            }
        ));
        assert!(matches!(
            report.skipped[1].1,
            DefinitionError::Formula {
                source: FormulaError::TooDeep { .. },
                ..
            }
        ));
        assert!(!registry.contains("abyss"));
        assert!(!registry.contains("spiral"));
    }

    #[test]
    fn key_supplies_missing_id() {
        let mut registry = DefinitionRegistry::new();
        let mut body = might();
        body.id.clear();
        body.name.clear();
        registry.load(vec![("rage".to_string(), Ok(body))]);

        let def = registry.get("rage").expect("keyed by catalog key");
        assert_eq!(def.id, "rage");
        assert_eq!(def.name, "rage");
    }

    #[test]
    fn mismatched_id_is_rejected() {
        let mut registry = DefinitionRegistry::new();
        let report = registry.load(vec![("rage".to_string(), Ok(might()))]);
        assert!(matches!(
            report.skipped[0].1,
            DefinitionError::IdMismatch { .. }
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn reload_replaces_contents() {
        let mut registry = DefinitionRegistry::from_definitions([might()]);
        assert_eq!(registry.len(), 1);

        registry.load(vec![("haste".to_string(), Ok(BuffDefinition::new("haste", 4.0)))]);
        assert!(!registry.contains("might"));
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["haste"]);
    }

    #[test]
    fn lookup_miss_is_none() {
        let registry = DefinitionRegistry::new();
        assert!(registry.get("nothing").is_none());
    }
}
