use reclaim_common::{RegionCoordinate, Result};
use std::path::{Path, PathBuf};

/// Region folders in the order vanilla lays out overworld, nether and end.
const REGION_SUBFOLDERS: [&str; 3] = ["region", "DIM-1/region", "DIM1/region"];

pub fn region_file_name(region: RegionCoordinate) -> String {
    format!("r.{}.{}.mca", region.x, region.z)
}

/// Parses `r.X.Z.mca`. Anything else (including `.mcr`, temp files and regions whose
/// chunks would not fit an `i32`) is `None`.
pub fn parse_region_file_name(name: &str) -> Option<RegionCoordinate> {
    let mut parts = name.split('.');
    if parts.next()? != "r" {
        return None;
    }
    let x = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next()? != "mca" || parts.next().is_some() {
        return None;
    }
    Some(RegionCoordinate::new(x, z)).filter(RegionCoordinate::is_addressable)
}

/// The first region folder present inside a world directory.
pub fn find_region_folder(world_dir: &Path) -> Option<PathBuf> {
    REGION_SUBFOLDERS
        .iter()
        .map(|sub| world_dir.join(sub))
        .find(|candidate| candidate.is_dir())
}

/// Every region file in `folder`, sorted by (x, z) so repeated listings agree.
pub fn list_regions(folder: &Path) -> Result<Vec<RegionCoordinate>> {
    let mut regions = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(region) = entry.file_name().to_str().and_then(parse_region_file_name) {
            regions.push(region);
        }
    }
    regions.sort();
    Ok(regions)
}
