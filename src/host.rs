use reclaim_common::{PlayerLocation, RegionCoordinate};
use reclaim_engine::{RegionLiveness, WorldHost};
use reclaim_region::find_region_folder;
use std::path::{Path, PathBuf};

/// Worlds as plain folders under one container, with nothing loaded and nobody online.
/// Meant for running against a world while the game server is stopped.
#[derive(Debug, Clone)]
pub struct DirectoryHost {
    container: PathBuf,
}

impl DirectoryHost {
    pub fn new(container: &Path) -> Self {
        Self {
            container: container.to_path_buf(),
        }
    }
}

impl WorldHost for DirectoryHost {
    fn region_folder(&self, world: &str) -> Option<PathBuf> {
        find_region_folder(&self.container.join(world))
    }

    fn online_players(&self) -> Vec<PlayerLocation> {
        Vec::new()
    }

    fn region_liveness(&self, _world: &str, _region: RegionCoordinate) -> RegionLiveness {
        RegionLiveness::Unloaded
    }
}
