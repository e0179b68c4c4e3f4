//! Engine configuration loader.

use std::path::Path;

use buff_core::EngineConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for engine configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// Missing keys keep their [`EngineConfig::default`] values.
    pub fn load(path: &Path) -> LoadResult<EngineConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parse config data from TOML text.
    pub fn parse(content: &str) -> LoadResult<EngineConfig> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = ConfigLoader::parse("max_instances_per_target = 16").expect("valid TOML");
        assert_eq!(config.max_instances_per_target, Some(16));
        assert_eq!(
            config.max_pending_commands,
            EngineConfig::DEFAULT_MAX_PENDING_COMMANDS
        );
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(ConfigLoader::parse("").expect("valid"), EngineConfig::default());
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(ConfigLoader::parse("max_pending_commands = \"many\"").is_err());
    }
}
