//! Data-driven buff content and loaders.
//!
//! This crate provides loaders for RON/TOML data files:
//! - Buff catalogs (RON or TOML, one entry per definition id)
//! - Engine configuration (TOML)
//! - A built-in catalog compiled into the crate
//!
//! All loaders deserialize buff-core types directly through its `serde`
//! feature.

#[cfg(feature = "loaders")]
pub mod builtin;

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use builtin::{BUILTIN_CATALOG, BUILTIN_CONFIG, builtin_config, builtin_registry};

#[cfg(feature = "loaders")]
pub use loaders::{CatalogFormat, CatalogLoader, ConfigLoader, ContentFactory, LoadResult};
