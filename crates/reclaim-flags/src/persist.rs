use crate::flag::ChunkFlag;
use reclaim_common::coords::local_index;
use reclaim_common::{RegionCoordinate, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk body of one region's flags.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegionRecord {
    #[serde(default)]
    damaged: bool,
    #[serde(default)]
    chunks: BTreeMap<String, Value>,
}

/// What came back from one region file.
#[derive(Debug, Default)]
pub struct LoadedRegion {
    pub flags: HashMap<usize, ChunkFlag>,
    pub damaged: bool,
    /// Keys that did not name a chunk of this region and were dropped.
    pub stray_keys: usize,
    /// Entries whose value was unreadable and are now `ChunkFlag::Unreadable`.
    pub unreadable: usize,
}

pub fn region_path(folder: &Path, world: &str, region: RegionCoordinate) -> PathBuf {
    folder
        .join(world)
        .join(format!("r.{}.{}.json", region.x, region.z))
}

fn parse_file_name(name: &str) -> Option<RegionCoordinate> {
    let stem = name.strip_prefix("r.")?.strip_suffix(".json")?;
    let (x, z) = stem.split_once('.')?;
    Some(RegionCoordinate::new(x.parse().ok()?, z.parse().ok()?))
}

fn parse_chunk_key(key: &str) -> Option<(i32, i32)> {
    let (x, z) = key.split_once(',')?;
    Some((x.trim().parse().ok()?, z.trim().parse().ok()?))
}

/// Region flag files inside one world folder.
pub fn list_region_files(world_dir: &Path) -> Result<Vec<(RegionCoordinate, PathBuf)>> {
    let mut regions = Vec::new();
    for entry in fs::read_dir(world_dir)? {
        let entry = entry?;
        if let Some(region) = entry.file_name().to_str().and_then(parse_file_name) {
            regions.push((region, entry.path()));
        }
    }
    regions.sort();
    Ok(regions)
}

/// Reads one region file. An `Err` means the file as a whole is unusable; individual bad
/// entries are degraded instead.
pub fn read_region(path: &Path, region: RegionCoordinate) -> Result<LoadedRegion> {
    let bytes = fs::read(path)?;
    let record: RegionRecord = serde_json::from_slice(&bytes)?;

    let mut loaded = LoadedRegion {
        damaged: record.damaged,
        ..LoadedRegion::default()
    };
    for (key, value) in &record.chunks {
        let Some((x, z)) = parse_chunk_key(key) else {
            loaded.stray_keys += 1;
            continue;
        };
        if RegionCoordinate::containing(x, z) != region {
            loaded.stray_keys += 1;
            continue;
        }
        let flag = ChunkFlag::from_json(value).unwrap_or_else(|| {
            loaded.unreadable += 1;
            ChunkFlag::Unreadable
        });
        loaded.flags.insert(local_index(x, z), flag);
    }
    Ok(loaded)
}

/// Writes one region file through a sibling `.tmp` and a rename, so a crash mid-write leaves
/// the previous version intact.
pub fn write_region(
    path: &Path,
    region: RegionCoordinate,
    flags: &HashMap<usize, ChunkFlag>,
    damaged: bool,
) -> Result<()> {
    let chunks = flags
        .iter()
        .map(|(index, flag)| {
            let (x, z) = region.chunk_at(*index);
            (format!("{},{}", x, z), flag.to_json())
        })
        .collect();
    let record = RegionRecord { damaged, chunks };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec(&record)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use reclaim_common::ReclaimError;
    use uuid::Uuid;

    fn scratch() -> PathBuf {
        std::env::temp_dir().join(format!("reclaim-persist-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(parse_file_name("r.-1.4.json"), Some(RegionCoordinate::new(-1, 4)));
        assert_eq!(parse_file_name("r.-1.4.json.tmp"), None);
        assert_eq!(parse_file_name("r.1.json"), None);
        assert_eq!(parse_chunk_key("-33, 7"), Some((-33, 7)));
        assert_eq!(parse_chunk_key("7"), None);
    }

    #[test]
    fn test_write_then_read() {
        let folder = scratch();
        let region = RegionCoordinate::new(-1, 0);
        let path = region_path(&folder, "world", region);

        let mut flags = HashMap::new();
        flags.insert(0, ChunkFlag::VisitedUntil(1_000));
        flags.insert(1023, ChunkFlag::Eternal);
        write_region(&path, region, &flags, true).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        let loaded = read_region(&path, region).unwrap();
        assert_eq!(loaded.flags, flags);
        assert!(loaded.damaged);
        assert_eq!(
            list_region_files(&folder.join("world")).unwrap(),
            vec![(region, path)]
        );
    }

    #[test]
    fn test_bad_entries_degrade() {
        let folder = scratch();
        let region = RegionCoordinate::new(0, 0);
        let path = region_path(&folder, "world", region);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"chunks": {"1,2": 5, "3,4": "tomorrow", "99,0": 5, "junk": 1}}"#,
        )
        .unwrap();

        let loaded = read_region(&path, region).unwrap();
        assert_eq!(loaded.flags.get(&local_index(1, 2)), Some(&ChunkFlag::VisitedUntil(5)));
        assert_eq!(loaded.flags.get(&local_index(3, 4)), Some(&ChunkFlag::Unreadable));
        assert_eq!(loaded.unreadable, 1);
        assert_eq!(loaded.stray_keys, 2);
        assert!(!loaded.damaged);
    }

    #[test]
    fn test_truncated_file_fails() {
        let folder = scratch();
        let region = RegionCoordinate::new(0, 0);
        let path = region_path(&folder, "world", region);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"chunks": {"1,2": 5, "#).unwrap();

        assert_matches!(read_region(&path, region), Err(ReclaimError::DataError(_)));
    }
}
