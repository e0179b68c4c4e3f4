//! Content factory for loading buff content from a data directory.

use std::path::{Path, PathBuf};

use buff_core::{DefinitionRegistry, EngineConfig, LoadReport};

use crate::loaders::{CatalogLoader, ConfigLoader, LoadResult};

/// Content factory that loads all buff content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml      (optional)
/// └── buffs.ron        (or buffs.toml)
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load engine configuration from `config.toml`, or the defaults when
    /// the file is absent.
    pub fn load_config(&self) -> LoadResult<EngineConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(EngineConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load the buff catalog from `buffs.ron`, falling back to `buffs.toml`.
    pub fn load_catalog(&self) -> LoadResult<(DefinitionRegistry, LoadReport)> {
        let path = self.catalog_path().ok_or_else(|| {
            anyhow::anyhow!(
                "No buff catalog (buffs.ron or buffs.toml) in {}",
                self.data_dir.display()
            )
        })?;
        CatalogLoader::load(&path)
    }

    fn catalog_path(&self) -> Option<PathBuf> {
        ["buffs.ron", "buffs.toml"]
            .into_iter()
            .map(|name| self.data_dir.join(name))
            .find(|path| path.exists())
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn loads_toml_catalog_and_default_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join("buffs.toml"),
            "[ward]\nbase_duration = 3.0\nstack_rule = \"none\"\n",
        )
        .expect("write catalog");

        let factory = ContentFactory::new(dir.path());
        let (registry, report) = factory.load_catalog().expect("catalog loads");
        assert!(report.is_clean());
        assert!(registry.contains("ward"));
        assert_eq!(factory.load_config().expect("defaults"), EngineConfig::default());
    }

    #[test]
    fn missing_catalog_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("config.toml"), "first_instance_id = 100\n")
            .expect("write config");

        let factory = ContentFactory::new(dir.path());
        assert!(factory.load_catalog().is_err());
        assert_eq!(factory.load_config().expect("config").first_instance_id, 100);
    }
}
