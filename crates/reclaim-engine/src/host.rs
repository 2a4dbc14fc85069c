use reclaim_common::{PlayerLocation, RegionCoordinate};
use std::path::PathBuf;

/// Whether the host currently holds a region's chunks in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionLiveness {
    Unloaded,
    Loaded,
    /// The host could not tell. Treated like `Loaded`.
    Indeterminate,
}

/// The game host the reclaimer runs inside. Calls are made from the tick thread only.
pub trait WorldHost {
    /// Folder holding the world's `r.X.Z.mca` files, `None` if the world does not exist.
    fn region_folder(&self, world: &str) -> Option<PathBuf>;

    fn online_players(&self) -> Vec<PlayerLocation>;

    fn region_liveness(&self, world: &str, region: RegionCoordinate) -> RegionLiveness;
}
