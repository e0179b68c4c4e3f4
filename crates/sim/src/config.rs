//! Simulation settings read from the environment.

use std::env;
use std::path::PathBuf;

/// Settings for one simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    /// Directory with `buffs.ron`/`buffs.toml` and `config.toml`.
    /// `None` uses the built-in catalog.
    pub data_dir: Option<PathBuf>,
    /// Number of ticks to run.
    pub steps: u32,
    /// Seconds per tick.
    pub delta: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            steps: 12,
            delta: 1.0,
        }
    }
}

impl SimConfig {
    /// Reads `BUFF_DATA_DIR`, `BUFF_SIM_STEPS` and `BUFF_SIM_DT`.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self {
            data_dir: env::var_os("BUFF_DATA_DIR").map(PathBuf::from),
            ..Self::default()
        };

        if let Some(steps) = read_env::<u32>("BUFF_SIM_STEPS") {
            config.steps = steps;
        }

        if let Some(delta) = read_env::<f64>("BUFF_SIM_DT") {
            if delta.is_finite() && delta > 0.0 {
                config.delta = delta;
            }
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
