/// Engine configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Upper bound on live instances per target. `None` means unlimited.
    ///
    /// Only the creation of a new instance is rejected; stacking on an
    /// existing instance is never blocked by this limit.
    pub max_instances_per_target: Option<usize>,

    /// Capacity of the deferred command queue. Commands queued beyond this
    /// are dropped with a warning.
    pub max_pending_commands: usize,

    /// First id handed out by the instance store.
    pub first_instance_id: u64,
}

impl EngineConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_PENDING_COMMANDS: usize = 1024;
    pub const DEFAULT_FIRST_INSTANCE_ID: u64 = 1;

    pub fn new() -> Self {
        Self {
            max_instances_per_target: None,
            max_pending_commands: Self::DEFAULT_MAX_PENDING_COMMANDS,
            first_instance_id: Self::DEFAULT_FIRST_INSTANCE_ID,
        }
    }

    pub fn with_instance_limit(limit: usize) -> Self {
        Self {
            max_instances_per_target: Some(limit),
            ..Self::new()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
