//! Buff catalog loader.
//!
//! A catalog is a map from definition id to definition body:
//!
//! ```text
//! // buffs.ron
//! {
//!     "might": (
//!         base_duration: 10.0,
//!         effects: [(target_property: "attack", base_value: 5.0)],
//!     ),
//! }
//! ```
//!
//! The outer map is parsed first; each body is then converted on its own, so
//! a malformed entry is reported in the [`LoadReport`] instead of failing the
//! whole file.

use std::collections::BTreeMap;
use std::path::Path;

use buff_core::{BuffDefinition, DefinitionError, DefinitionRegistry, LoadReport};

use crate::loaders::{LoadResult, read_file};

/// Catalog file syntax.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogFormat {
    Ron,
    Toml,
}

impl CatalogFormat {
    /// Picks the format from a file extension (`.ron` or `.toml`).
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            ext if ext.eq_ignore_ascii_case("ron") => Some(Self::Ron),
            ext if ext.eq_ignore_ascii_case("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

type Entries = Vec<(String, Result<BuffDefinition, DefinitionError>)>;

/// Loader for buff catalogs.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load a catalog file into a fresh registry.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to a `.ron` or `.toml` catalog
    ///
    /// # Returns
    ///
    /// The registry and a report of skipped entries. Only unreadable files
    /// and syntax errors in the outer map are errors.
    pub fn load(path: &Path) -> LoadResult<(DefinitionRegistry, LoadReport)> {
        let format = CatalogFormat::from_path(path).ok_or_else(|| {
            anyhow::anyhow!("Unknown catalog format for {}", path.display())
        })?;
        let content = read_file(path)?;
        let loaded = Self::parse(&content, format)
            .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))?;
        Ok(loaded)
    }

    /// Parse catalog text in the given format.
    pub fn parse(
        content: &str,
        format: CatalogFormat,
    ) -> LoadResult<(DefinitionRegistry, LoadReport)> {
        let entries = match format {
            CatalogFormat::Ron => Self::ron_entries(content)?,
            CatalogFormat::Toml => Self::toml_entries(content)?,
        };

        let mut registry = DefinitionRegistry::new();
        let report = registry.load(entries);
        tracing::info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            "buff catalog parsed"
        );
        Ok((registry, report))
    }

    fn ron_entries(content: &str) -> LoadResult<Entries> {
        let raw: BTreeMap<String, ron::Value> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse buff catalog RON: {}", e))?;

        Ok(raw
            .into_iter()
            .map(|(key, value)| {
                let parsed = value
                    .into_rust::<BuffDefinition>()
                    .map_err(|e| DefinitionError::Malformed(e.to_string()));
                (key, parsed)
            })
            .collect())
    }

    fn toml_entries(content: &str) -> LoadResult<Entries> {
        let raw: toml::Table = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse buff catalog TOML: {}", e))?;

        Ok(raw
            .into_iter()
            .map(|(key, value)| {
                let parsed = value
                    .try_into::<BuffDefinition>()
                    .map_err(|e| DefinitionError::Malformed(e.to_string()));
                (key, parsed)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use buff_core::{CalculationType, StackRule, TriggerTiming};

    use super::*;

    const RON_CATALOG: &str = r#"{
        "fury": (
            name: "Fury",
            stack_rule: "Stack",
            max_stack: 5,
            base_duration: 10,
            effects: [
                (
                    target_property: "attack",
                    calculation_type: "additive",
                    base_value: 10.0,
                    per_stack_value: 5.0,
                ),
            ],
        ),
        "broken": (
            max_stack: "lots",
        ),
        "zero": (
            max_stack: 0,
        ),
    }"#;

    #[test]
    fn ron_entries_load_independently() {
        let (registry, report) =
            CatalogLoader::parse(RON_CATALOG, CatalogFormat::Ron).expect("outer map parses");

        assert_eq!(report.loaded, vec!["fury"]);
        let skipped: Vec<_> = report.skipped.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(skipped, vec!["broken", "zero"]);
        assert!(matches!(report.skipped[0].1, DefinitionError::Malformed(_)));
        assert_eq!(report.skipped[1].1, DefinitionError::ZeroMaxStack);

        let fury = registry.get("fury").expect("fury loaded");
        assert_eq!(fury.id, "fury");
        assert_eq!(fury.stack_rule, StackRule::Stack);
        assert_eq!(fury.effects[0].calculation_type, CalculationType::Additive);
        assert_eq!(fury.effects[0].trigger_timing, TriggerTiming::Continuous);
    }

    #[test]
    fn toml_catalog_loads() {
        let catalog = r#"
            [regen]
            base_duration = 6.0

            [[regen.effects]]
            effect_type = "add"
            target_property = "hp"
            trigger_timing = "periodic"
            trigger_interval = 1.0
            base_value = 3.0

            [mismatch]
            id = "other"
        "#;
        let (registry, report) =
            CatalogLoader::parse(catalog, CatalogFormat::Toml).expect("table parses");

        assert!(registry.contains("regen"));
        assert_eq!(registry.len(), 1);
        assert!(matches!(
            report.skipped[0].1,
            DefinitionError::IdMismatch { .. }
        ));
        let regen = registry.get("regen").expect("regen loaded");
        assert_eq!(regen.effects[0].trigger_timing, TriggerTiming::Periodic);
    }

    #[test]
    fn invalid_outer_syntax_is_an_error() {
        assert!(CatalogLoader::parse("{ \"a\": ", CatalogFormat::Ron).is_err());
        assert!(CatalogLoader::parse("[a", CatalogFormat::Toml).is_err());
    }

    #[test]
    fn load_reads_from_disk_by_extension() {
        let mut file = tempfile::Builder::new()
            .suffix(".ron")
            .tempfile()
            .expect("temp file");
        file.write_all(RON_CATALOG.as_bytes()).expect("write");

        let (registry, _) = CatalogLoader::load(file.path()).expect("load");
        assert!(registry.contains("fury"));

        let other = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("temp file");
        assert!(CatalogLoader::load(other.path()).is_err());
    }
}
