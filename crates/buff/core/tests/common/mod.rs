#![allow(dead_code)]

use std::collections::HashMap;

use buff_core::{BuffTarget, EntityId};

/// Property-bag entity used by the integration tests.
#[derive(Clone, Debug, Default)]
pub struct Hero {
    pub id: EntityId,
    pub stats: HashMap<String, f64>,
}

impl Hero {
    pub fn new(id: u32) -> Self {
        Self {
            id: EntityId(id),
            stats: HashMap::new(),
        }
    }

    pub fn with(mut self, stat: &str, value: f64) -> Self {
        self.stats.insert(stat.to_string(), value);
        self
    }
}

impl BuffTarget for Hero {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn property(&self, name: &str) -> f64 {
        self.stats.get(name).copied().unwrap_or(0.0)
    }

    fn set_property(&mut self, name: &str, value: f64) {
        self.stats.insert(name.to_string(), value);
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
