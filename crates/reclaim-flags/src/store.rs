use crate::flag::ChunkFlag;
use crate::persist::{list_region_files, read_region, region_path, write_region};
use reclaim_common::{ChunkCoordinate, RegionCoordinate, ReclaimError, Result};
use reclaim_logger::severity::LogSeverity::{Error, Warning};
use reclaim_logger::{debug, log, DebugLevel};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
struct RegionFlags {
    flags: HashMap<usize, ChunkFlag>,
    /// Set when the persisted file could not be read at all; every member without an
    /// explicit entry then reads as unreadable.
    damaged: bool,
    dirty: bool,
}

impl RegionFlags {
    fn is_empty(&self) -> bool {
        self.flags.is_empty() && !self.damaged
    }
}

/// Per-chunk visit flags for every world, persisted as one JSON file per region.
///
/// All access is from the single tick loop; nothing here locks.
#[derive(Debug)]
pub struct FlagStore {
    folder: PathBuf,
    worlds: HashMap<String, HashMap<RegionCoordinate, RegionFlags>>,
}

impl FlagStore {
    /// An empty store that saves under `folder`. Nothing is read.
    pub fn new(folder: &Path) -> Self {
        Self {
            folder: folder.to_path_buf(),
            worlds: HashMap::new(),
        }
    }

    /// Loads everything under `folder`. Only failing to create the folder is an error: an
    /// unreadable world folder is skipped, an unreadable region file marks that region
    /// damaged and is kept aside as `*.corrupt`.
    pub fn load(folder: &Path) -> Result<Self> {
        fs::create_dir_all(folder)?;
        let mut store = Self::new(folder);

        for entry in fs::read_dir(folder)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log(format!("Skipping unreadable flag entry: {}", err), Warning);
                    continue;
                }
            };
            if !entry.path().is_dir() {
                continue;
            }
            let Some(world) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            store.load_world(&world, &entry.path());
        }
        Ok(store)
    }

    fn load_world(&mut self, world: &str, world_dir: &Path) {
        let files = match list_region_files(world_dir) {
            Ok(files) => files,
            Err(err) => {
                log(format!("Unable to list flags for {}: {}", world, err), Error);
                return;
            }
        };

        let regions = self.worlds.entry(world.to_owned()).or_default();
        for (region, path) in files {
            match read_region(&path, region) {
                Ok(loaded) => {
                    if loaded.unreadable + loaded.stray_keys > 0 {
                        debug(DebugLevel::High, || {
                            format!(
                                "{} {}: {} unreadable and {} stray flag entries",
                                world, region, loaded.unreadable, loaded.stray_keys
                            )
                        });
                    }
                    regions.insert(
                        region,
                        RegionFlags {
                            flags: loaded.flags,
                            damaged: loaded.damaged,
                            dirty: false,
                        },
                    );
                }
                Err(err) => {
                    log(
                        format!(
                            "Flags for {} {} are unreadable, treating the region as unknown: {}",
                            world, region, err
                        ),
                        Warning,
                    );
                    if let Err(err) = fs::rename(&path, path.with_extension("json.corrupt")) {
                        log(format!("Unable to set aside {}: {}", path.display(), err), Warning);
                    }
                    regions.insert(
                        region,
                        RegionFlags {
                            flags: HashMap::new(),
                            damaged: true,
                            dirty: true,
                        },
                    );
                }
            }
        }
    }

    fn region(&self, world: &str, region: RegionCoordinate) -> Option<&RegionFlags> {
        self.worlds.get(world)?.get(&region)
    }

    fn region_mut(&mut self, world: &str, region: RegionCoordinate) -> &mut RegionFlags {
        self.worlds
            .entry(world.to_owned())
            .or_default()
            .entry(region)
            .or_default()
    }

    /// The current flag of a chunk, `None` if it was never recorded.
    pub fn get(&self, coordinate: &ChunkCoordinate) -> Option<ChunkFlag> {
        let region = self.region(&coordinate.world, coordinate.region())?;
        match region.flags.get(&coordinate.local_index()) {
            Some(flag) => Some(*flag),
            None if region.damaged => Some(ChunkFlag::Unreadable),
            None => None,
        }
    }

    /// Extends a chunk's freshness to at least `visited_until`. Never shortens it and never
    /// replaces an eternal flag, so repeated or out-of-order calls are harmless.
    pub fn set(&mut self, coordinate: &ChunkCoordinate, visited_until: i64) {
        let index = coordinate.local_index();
        let region = self.region_mut(&coordinate.world, coordinate.region());
        let existing = region.flags.get(&index).copied();
        let merged = ChunkFlag::merge(existing, visited_until);
        if existing != Some(merged) {
            region.flags.insert(index, merged);
            region.dirty = true;
        }
    }

    pub fn set_eternal(&mut self, coordinate: &ChunkCoordinate) {
        let index = coordinate.local_index();
        let region = self.region_mut(&coordinate.world, coordinate.region());
        if region.flags.insert(index, ChunkFlag::Eternal) != Some(ChunkFlag::Eternal) {
            region.dirty = true;
        }
    }

    /// Forgets a chunk's flag, eternal or not. Administrative override of `set`.
    pub fn unflag(&mut self, coordinate: &ChunkCoordinate) {
        let index = coordinate.local_index();
        let region = self.region_mut(&coordinate.world, coordinate.region());
        if region.flags.remove(&index).is_some() {
            region.dirty = true;
        }
    }

    /// Forgets every flag of a region and its damage marker, e.g. after the region file
    /// itself was deleted. The persisted file goes on the next save.
    pub fn clear_region(&mut self, world: &str, region: RegionCoordinate) {
        let flags = self.region_mut(world, region);
        flags.flags.clear();
        flags.damaged = false;
        flags.dirty = true;
    }

    pub fn is_damaged(&self, world: &str, region: RegionCoordinate) -> bool {
        self.region(world, region).map_or(false, |r| r.damaged)
    }

    /// Number of recorded chunk flags across all worlds.
    pub fn len(&self) -> usize {
        self.worlds
            .values()
            .flat_map(|regions| regions.values())
            .map(|region| region.flags.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dirty(&self) -> bool {
        self.worlds
            .values()
            .flat_map(|regions| regions.values())
            .any(|region| region.dirty)
    }

    /// Writes every changed region. A region that failed stays dirty for the next save; the
    /// last failure is returned after all regions were attempted.
    pub fn save(&mut self) -> Result<usize> {
        let mut written = 0;
        let mut failure = None;

        for (world, regions) in self.worlds.iter_mut() {
            for (region, flags) in regions.iter_mut().filter(|(_, flags)| flags.dirty) {
                let path = region_path(&self.folder, world, *region);
                let outcome = if flags.is_empty() {
                    match fs::remove_file(&path) {
                        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(ReclaimError::from(err)),
                        _ => Ok(()),
                    }
                } else {
                    write_region(&path, *region, &flags.flags, flags.damaged)
                };
                match outcome {
                    Ok(()) => {
                        flags.dirty = false;
                        written += 1;
                    }
                    Err(err) => {
                        log(
                            format!("Unable to save flags for {} {}: {}", world, region, err),
                            Error,
                        );
                        failure = Some(err);
                    }
                }
            }
            regions.retain(|_, flags| flags.dirty || !flags.is_empty());
        }

        match failure {
            Some(ReclaimError::IoError(err)) => Err(ReclaimError::StoreError(err.to_string())),
            Some(err) => Err(err),
            None => Ok(written),
        }
    }
}
