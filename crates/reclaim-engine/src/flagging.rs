use crate::config::Config;
use reclaim_common::{ChunkCoordinate, PlayerLocation};
use reclaim_flags::FlagStore;
use reclaim_logger::{debug, DebugLevel};

/// Turns player presence and chunk generation into flags.
#[derive(Debug, Clone)]
pub struct FlaggingEngine {
    duration: i64,
    radius: i32,
    flag_new_chunks: bool,
    worlds: Vec<String>,
}

impl FlaggingEngine {
    pub fn from_config(config: &Config) -> Self {
        Self {
            duration: config.flag_duration_millis(),
            radius: config.flag_radius(),
            flag_new_chunks: !config.delete_new_unvisited(),
            worlds: config.worlds.clone(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.duration > 0
    }

    fn tracks(&self, world: &str) -> bool {
        self.worlds.iter().any(|tracked| tracked == world)
    }

    /// Flags the square of chunks around `center`, out to the configured radius.
    pub fn flag_around(&self, store: &mut FlagStore, center: &ChunkCoordinate, now: i64) -> usize {
        if !self.enabled() || !self.tracks(&center.world) {
            return 0;
        }
        let until = now.saturating_add(self.duration);
        let mut flagged = 0;
        let xs = center.x.saturating_sub(self.radius)..=center.x.saturating_add(self.radius);
        for x in xs {
            let zs = center.z.saturating_sub(self.radius)..=center.z.saturating_add(self.radius);
            for z in zs {
                store.set(&ChunkCoordinate::new(&center.world, x, z), until);
                flagged += 1;
            }
        }
        flagged
    }

    /// One pass over every online player.
    pub fn sweep(&self, store: &mut FlagStore, players: &[PlayerLocation], now: i64) -> usize {
        let flagged = players
            .iter()
            .map(|player| self.flag_around(store, &player.chunk(), now))
            .sum();
        debug(DebugLevel::Medium, || {
            format!("Flag sweep covered {} players, {} chunks", players.len(), flagged)
        });
        flagged
    }

    /// Freshly generated chunks count as visited unless new chunks are meant to be deletable.
    pub fn on_chunk_generated(
        &self,
        store: &mut FlagStore,
        coordinate: &ChunkCoordinate,
        now: i64,
    ) -> bool {
        if !self.enabled() || !self.flag_new_chunks || !self.tracks(&coordinate.world) {
            return false;
        }
        store.set(coordinate, now.saturating_add(self.duration));
        true
    }
}
