//! Engine configuration.
//!
//! Settings come from a TOML file. Loading never fails: a missing or malformed file falls
//! back to [`EngineConfig::default`] with a warning, and absent keys take their defaults.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::events::DEFAULT_CAPACITY;
use crate::inventory::DEFAULT_SLOTS;
use crate::save_files::SaveFormat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub starting_health: i64,
    /// Seconds between tick callbacks.
    pub tick_interval_secs: f64,
    /// Most messages the event sink holds before dropping the oldest.
    pub message_capacity: usize,
    pub inventory_slots: Vec<String>,
    pub save_format: SaveFormat,
    pub save_dir: PathBuf,
    /// Written after every tick when set.
    pub autosave: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_health: 10,
            tick_interval_secs: 5.0,
            message_capacity: DEFAULT_CAPACITY,
            inventory_slots: DEFAULT_SLOTS.iter().map(ToString::to_string).collect(),
            save_format: SaveFormat::Ron,
            save_dir: default_save_dir(),
            autosave: None,
        }
    }
}

impl EngineConfig {
    /// Tick interval as a `Duration`. Non-finite or non-positive values fall back to the
    /// default interval.
    pub fn tick_interval(&self) -> Duration {
        if self.tick_interval_secs.is_finite() && self.tick_interval_secs > 0.0 {
            Duration::from_secs_f64(self.tick_interval_secs)
        } else {
            warn!(
                "invalid tick interval {}; using {}s",
                self.tick_interval_secs,
                EngineConfig::default().tick_interval_secs
            );
            Duration::from_secs_f64(EngineConfig::default().tick_interval_secs)
        }
    }
}

/// Platform data directory for saves, or `saved_games` if there is none.
fn default_save_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::data_local_dir)
        .map_or_else(|| PathBuf::from("saved_games"), |base| base.join("story_engine").join("saves"))
}

/// Load engine settings from a TOML file, falling back to defaults on error.
pub fn load_config(toml_path: &Path) -> EngineConfig {
    match try_load_config(toml_path) {
        Ok(config) => {
            info!("engine config loaded from '{}'", toml_path.display());
            config
        },
        Err(e) => {
            warn!(
                "Could not load engine config from '{}': {e:#}. Using defaults.",
                toml_path.display()
            );
            EngineConfig::default()
        },
    }
}

/// Attempts to load engine settings from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn try_load_config(toml_path: &Path) -> Result<EngineConfig> {
    let raw = fs::read_to_string(toml_path)
        .with_context(|| format!("reading engine config from '{}'", toml_path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing engine config from '{}'", toml_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(
            &path,
            "starting_health = 25\ntick_interval_secs = 0.5\nsave_format = \"json\"\ninventory_slots = [\"Pocket\"]\n",
        )
        .unwrap();

        let config = load_config(&path);
        assert_eq!(config.starting_health, 25);
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
        assert_eq!(config.save_format, SaveFormat::Json);
        assert_eq!(config.inventory_slots, vec!["Pocket".to_string()]);
        assert_eq!(config.message_capacity, DEFAULT_CAPACITY);
        assert!(config.autosave.is_none());
    }

    #[test]
    fn missing_or_broken_file_falls_back() {
        let dir = tempdir().unwrap();
        assert_eq!(load_config(&dir.path().join("absent.toml")), EngineConfig::default());

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "starting_health = \"lots\"").unwrap();
        assert_eq!(load_config(&broken), EngineConfig::default());
    }

    #[test]
    fn bad_interval_uses_default() {
        let config = EngineConfig {
            tick_interval_secs: -1.0,
            ..EngineConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_secs(5));
    }
}
