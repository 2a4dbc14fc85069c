#![allow(dead_code)]

use reclaim_common::{PlayerLocation, RegionCoordinate};
use reclaim_engine::{Config, ProtectionHook, RegionLiveness, WorldHost};
use reclaim_nbt::{NbtFile, Tag};
use reclaim_region::{region_file_name, RegionBuilder};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use uuid::Uuid;

pub const DAY: i64 = 86_400_000;
pub const NOW: i64 = 1_700_000_000_000;

pub fn scratch() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("reclaim-engine-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn chunk_nbt() -> NbtFile {
    let mut level = HashMap::new();
    level.insert("Status".to_owned(), Tag::String("minecraft:full".to_owned()));
    level.insert("DataVersion".to_owned(), Tag::Int(3700));
    NbtFile::new("", Tag::Compound(level))
}

/// A region with every one of its 1024 chunks generated.
pub fn write_full_region(folder: &Path, region: RegionCoordinate) -> PathBuf {
    let path = folder.join(region_file_name(region));
    RegionBuilder::filled(&chunk_nbt())
        .unwrap()
        .write(&path)
        .unwrap();
    path
}

pub fn write_region(folder: &Path, region: RegionCoordinate, builder: RegionBuilder) -> PathBuf {
    let path = folder.join(region_file_name(region));
    builder.write(&path).unwrap();
    path
}

/// Host backed by plain folders, with scriptable players and loaded regions.
#[derive(Default)]
pub struct TestHost {
    pub folders: HashMap<String, PathBuf>,
    pub players: RefCell<Vec<PlayerLocation>>,
    pub loaded: RefCell<HashSet<(String, RegionCoordinate)>>,
}

impl TestHost {
    pub fn with_world(mut self, world: &str, folder: &Path) -> Self {
        self.folders.insert(world.to_owned(), folder.to_path_buf());
        self
    }
}

impl WorldHost for TestHost {
    fn region_folder(&self, world: &str) -> Option<PathBuf> {
        self.folders.get(world).cloned()
    }

    fn online_players(&self) -> Vec<PlayerLocation> {
        self.players.borrow().clone()
    }

    fn region_liveness(&self, world: &str, region: RegionCoordinate) -> RegionLiveness {
        if self.loaded.borrow().contains(&(world.to_owned(), region)) {
            RegionLiveness::Loaded
        } else {
            RegionLiveness::Unloaded
        }
    }
}

/// Config for `worlds` with no reset window and no pause between cycles.
pub fn config(worlds: &[&str], data: &Path) -> Config {
    let mut config = Config {
        worlds: worlds.iter().map(|world| world.to_string()).collect(),
        chunks_per_deletion: 1024,
        ticks_per_deletion: 1,
        millis_between_cycles: 0,
        data_folder: data.to_path_buf(),
        ..Config::default()
    };
    for world in worlds {
        config.reset.insert(world.to_string(), 0);
    }
    config
}

/// Hook whose protection and usability can be flipped from the test.
pub struct SwitchHook {
    pub name: &'static str,
    pub protected: HashSet<(i32, i32)>,
    pub enabled: Rc<Cell<bool>>,
    pub usable: Rc<Cell<bool>>,
}

impl SwitchHook {
    pub fn new(name: &'static str, chunks: &[(i32, i32)]) -> Self {
        Self {
            name,
            protected: chunks.iter().copied().collect(),
            enabled: Rc::new(Cell::new(true)),
            usable: Rc::new(Cell::new(true)),
        }
    }
}

impl ProtectionHook for SwitchHook {
    fn protection_name(&self) -> &str {
        self.name
    }

    fn is_hook_usable(&self) -> bool {
        self.usable.get()
    }

    fn is_chunk_protected(&self, _world: &str, chunk_x: i32, chunk_z: i32) -> bool {
        self.enabled.get() && self.protected.contains(&(chunk_x, chunk_z))
    }
}
