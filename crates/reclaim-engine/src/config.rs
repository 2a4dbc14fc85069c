use reclaim_common::{ReclaimError, Result};
use reclaim_logger::severity::LogSeverity::Warning;
use reclaim_logger::{debug, log, DebugLevel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Widest flag square one player may produce per sweep, in chunks from the center.
pub const MAX_FLAG_RADIUS: i32 = 32;

/// Everything the reclaimer reads from `reclaim.json`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub worlds: Vec<String>,
    pub flag_duration_days: f64,
    pub flag_interval: u64,
    pub flag_autosave_interval: u64,
    pub chunk_flag_radius: i32,
    pub delete_new_unvisited_chunks: bool,
    pub chunks_per_deletion: usize,
    pub ticks_per_deletion: u64,
    pub millis_between_cycles: i64,
    pub allow_concurrent_cycles: bool,
    /// Per world, the epoch millisecond before which no cycle may run.
    pub reset: BTreeMap<String, i64>,
    pub hooks: BTreeMap<String, bool>,
    pub inspect_chunk_data: bool,
    pub debug_level: String,
    pub data_folder: PathBuf,
    pub world_container: PathBuf,
    pub spawn_chunk_radius: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worlds: Vec::new(),
            flag_duration_days: 30.0,
            flag_interval: 200,
            flag_autosave_interval: 6_000,
            chunk_flag_radius: 4,
            delete_new_unvisited_chunks: false,
            chunks_per_deletion: 32,
            ticks_per_deletion: 20,
            millis_between_cycles: 7 * 86_400_000,
            allow_concurrent_cycles: false,
            reset: BTreeMap::new(),
            hooks: BTreeMap::new(),
            inspect_chunk_data: false,
            debug_level: "off".to_owned(),
            data_folder: PathBuf::from("reclaim-data"),
            world_container: PathBuf::from("."),
            spawn_chunk_radius: 0,
        }
    }
}

impl Config {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                ReclaimError::ConfigError(format!("{}: {}", path.display(), err))
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn flag_duration_millis(&self) -> i64 {
        (self.flag_duration_days.max(0.0) * MILLIS_PER_DAY) as i64
    }

    pub fn flagging_enabled(&self) -> bool {
        self.flag_duration_millis() > 0
    }

    /// Without flagging nothing would ever mark new chunks, so they are always eligible.
    pub fn delete_new_unvisited(&self) -> bool {
        self.delete_new_unvisited_chunks || !self.flagging_enabled()
    }

    pub fn chunks_per_check(&self) -> usize {
        self.chunks_per_deletion.max(1)
    }

    pub fn ticks_per_check(&self) -> u64 {
        self.ticks_per_deletion.max(1)
    }

    pub fn flag_radius(&self) -> i32 {
        if self.chunk_flag_radius > MAX_FLAG_RADIUS {
            debug(DebugLevel::Low, || {
                format!(
                    "chunk-flag-radius {} clamped to {}",
                    self.chunk_flag_radius, MAX_FLAG_RADIUS
                )
            });
        }
        self.chunk_flag_radius.clamp(0, MAX_FLAG_RADIUS)
    }

    pub fn is_world_enabled(&self, world: &str) -> bool {
        self.worlds.iter().any(|enabled| enabled == world)
    }

    pub fn reset_gate(&self, world: &str) -> Option<i64> {
        self.reset.get(world).copied()
    }

    /// Gives every enabled world without a gate one at `now + flag duration`, so fresh
    /// worlds gather flags before their first destructive pass. Returns whether anything
    /// changed and the file should be written back.
    pub fn ensure_reset_gates(&mut self, now: i64) -> bool {
        let gate = now.saturating_add(self.flag_duration_millis());
        let mut changed = false;
        for world in &self.worlds {
            if !self.reset.contains_key(world) {
                self.reset.insert(world.clone(), gate);
                changed = true;
            }
        }
        changed
    }

    pub fn verbosity(&self) -> DebugLevel {
        self.debug_level.parse().unwrap_or_else(|err| {
            log(format!("{}, falling back to off", err), Warning);
            DebugLevel::Off
        })
    }

    /// Missing entries default to enabled.
    pub fn hook_enabled(&self, name: &str) -> bool {
        self.hooks.get(name).copied().unwrap_or(true)
    }

    /// Union of the known default hook names and the configured ones.
    pub fn hook_names<'a, I>(&self, defaults: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        defaults
            .into_iter()
            .map(str::to_owned)
            .chain(self.hooks.keys().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults_from_empty_object() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.flagging_enabled());
        assert!(!config.delete_new_unvisited());
    }

    #[test]
    fn test_kebab_case_keys() {
        let config: Config = serde_json::from_str(
            r#"{
                "worlds": ["world", "world_nether"],
                "flag-duration-days": 0.5,
                "chunks-per-deletion": 0,
                "allow-concurrent-cycles": true,
                "reset": {"world": 1000},
                "hooks": {"Spawn": false},
                "debug-level": "high"
            }"#,
        )
        .unwrap();
        assert_eq!(config.flag_duration_millis(), 43_200_000);
        assert_eq!(config.chunks_per_check(), 1);
        assert!(config.allow_concurrent_cycles);
        assert_eq!(config.reset_gate("world"), Some(1000));
        assert_eq!(config.reset_gate("world_nether"), None);
        assert!(!config.hook_enabled("Spawn"));
        assert!(config.hook_enabled("Towns"));
        assert_eq!(config.verbosity(), DebugLevel::High);
    }

    #[test]
    fn test_zero_duration_forces_new_chunk_deletion() {
        let config = Config {
            flag_duration_days: 0.0,
            delete_new_unvisited_chunks: false,
            ..Config::default()
        };
        assert!(!config.flagging_enabled());
        assert!(config.delete_new_unvisited());
    }

    #[test]
    fn test_flag_radius_is_clamped() {
        let radius = |chunk_flag_radius| {
            Config {
                chunk_flag_radius,
                ..Config::default()
            }
            .flag_radius()
        };
        assert_eq!(radius(-3), 0);
        assert_eq!(radius(4), 4);
        assert_eq!(radius(MAX_FLAG_RADIUS), MAX_FLAG_RADIUS);
        assert_eq!(radius(i32::MAX), MAX_FLAG_RADIUS);
    }

    #[test]
    fn test_ensure_reset_gates() {
        let mut config = Config {
            worlds: vec!["world".to_owned(), "old".to_owned()],
            flag_duration_days: 1.0,
            ..Config::default()
        };
        config.reset.insert("old".to_owned(), 5);

        assert!(config.ensure_reset_gates(1_000));
        assert_eq!(config.reset_gate("world"), Some(1_000 + 86_400_000));
        assert_eq!(config.reset_gate("old"), Some(5));
        assert!(!config.ensure_reset_gates(2_000));
    }

    #[test]
    fn test_hook_names_union() {
        let mut config = Config::default();
        config.hooks.insert("Claims".to_owned(), true);
        config.hooks.insert("Spawn".to_owned(), false);
        let names = config.hook_names(["Spawn", "Towns"]);
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["Claims".to_owned(), "Spawn".to_owned(), "Towns".to_owned()]
        );
    }

    #[test]
    fn test_bad_debug_level_falls_back() {
        let config = Config {
            debug_level: "verbose".to_owned(),
            ..Config::default()
        };
        assert_eq!(config.verbosity(), DebugLevel::Off);
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = std::env::temp_dir().join(format!("reclaim-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("reclaim.json");
        assert_eq!(Config::load(&path).unwrap(), Config::default());

        std::fs::write(&path, b"{\"worlds\": [").unwrap();
        assert_matches!(Config::load(&path), Err(ReclaimError::ConfigError(_)));

        let config = Config {
            worlds: vec!["world".to_owned()],
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
