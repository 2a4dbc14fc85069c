use reclaim_common::{ReclaimError, Result};
use reclaim_nbt::{Compression, NbtFile, Tag};
use std::path::Path;

/// Block coordinates of the world spawn, from `level.dat` (`Data.SpawnX` / `Data.SpawnZ`).
pub fn read_spawn(world_dir: &Path) -> Result<(i32, i32)> {
    let bytes = std::fs::read(world_dir.join("level.dat"))?;
    let level = NbtFile::read_compressed(&bytes, Compression::Gzip)?;

    let field = |name: &str| {
        level
            .root
            .lookup(&["Data", name])
            .and_then(Tag::as_i64)
            .and_then(|value| i32::try_from(value).ok())
            .ok_or_else(|| {
                ReclaimError::DataError(format!("level.dat has no usable Data.{}", name))
            })
    };
    Ok((field("SpawnX")?, field("SpawnZ")?))
}

/// Chunk containing the world spawn.
pub fn spawn_chunk(world_dir: &Path) -> Result<(i32, i32)> {
    let (x, z) = read_spawn(world_dir)?;
    Ok((x >> 4, z >> 4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn world_with_level(data: HashMap<String, Tag>) -> std::path::PathBuf {
        let world = std::env::temp_dir().join(format!("reclaim-level-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&world).unwrap();
        let mut root = HashMap::new();
        root.insert("Data".to_owned(), Tag::Compound(data));
        let bytes = NbtFile::new("", Tag::Compound(root))
            .to_compressed(Compression::Gzip)
            .unwrap();
        std::fs::write(world.join("level.dat"), bytes).unwrap();
        world
    }

    #[test]
    fn test_read_spawn() {
        let mut data = HashMap::new();
        data.insert("SpawnX".to_owned(), Tag::Int(-40));
        data.insert("SpawnY".to_owned(), Tag::Int(70));
        data.insert("SpawnZ".to_owned(), Tag::Int(250));
        let world = world_with_level(data);

        assert_eq!(read_spawn(&world).unwrap(), (-40, 250));
        assert_eq!(spawn_chunk(&world).unwrap(), (-3, 15));
    }

    #[test]
    fn test_missing_spawn_field() {
        let mut data = HashMap::new();
        data.insert("SpawnX".to_owned(), Tag::Int(0));
        let world = world_with_level(data);
        assert_matches!(read_spawn(&world), Err(ReclaimError::DataError(_)));
    }

    #[test]
    fn test_spawn_out_of_block_range() {
        let mut data = HashMap::new();
        data.insert("SpawnX".to_owned(), Tag::Long(i64::from(i32::MAX) + 1));
        data.insert("SpawnZ".to_owned(), Tag::Long(12));
        let world = world_with_level(data);
        assert_matches!(read_spawn(&world), Err(ReclaimError::DataError(_)));
    }

    #[test]
    fn test_missing_level_dat() {
        let world = std::env::temp_dir().join(format!("reclaim-level-{}", Uuid::new_v4()));
        assert_matches!(read_spawn(&world), Err(ReclaimError::IoError(_)));
    }
}
