use std::fmt;

/// Chunks along one edge of a region file.
pub const REGION_WIDTH: i32 = 32;

/// Chunks held by one region file.
pub const CHUNKS_PER_REGION: usize = (REGION_WIDTH * REGION_WIDTH) as usize;

/// A chunk in a named world. Used as a map key, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoordinate {
    pub world: String,
    pub x: i32,
    pub z: i32,
}

impl ChunkCoordinate {
    pub fn new(world: &str, x: i32, z: i32) -> Self {
        Self {
            world: world.to_owned(),
            x,
            z,
        }
    }

    /// The region file holding this chunk.
    pub fn region(&self) -> RegionCoordinate {
        RegionCoordinate::containing(self.x, self.z)
    }

    /// Slot of this chunk inside its region file (0..1024), row-major on z.
    pub fn local_index(&self) -> usize {
        local_index(self.x, self.z)
    }
}

impl fmt::Display for ChunkCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.world, self.x, self.z)
    }
}

/// Slot of the chunk `(x, z)` inside its region file.
pub fn local_index(chunk_x: i32, chunk_z: i32) -> usize {
    let local_x = chunk_x & (REGION_WIDTH - 1);
    let local_z = chunk_z & (REGION_WIDTH - 1);
    (local_z * REGION_WIDTH + local_x) as usize
}

/// Region file coordinates, `(chunk_x >> 5, chunk_z >> 5)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionCoordinate {
    pub x: i32,
    pub z: i32,
}

impl RegionCoordinate {
    /// Smallest region axis value whose chunks fit in an `i32`.
    pub const MIN_AXIS: i32 = i32::MIN >> 5;
    /// Largest region axis value whose chunks fit in an `i32`.
    pub const MAX_AXIS: i32 = i32::MAX >> 5;

    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Whether every member chunk has `i32` coordinates. Regions from `containing` always do.
    pub fn is_addressable(&self) -> bool {
        let axis = Self::MIN_AXIS..=Self::MAX_AXIS;
        axis.contains(&self.x) && axis.contains(&self.z)
    }

    pub fn containing(chunk_x: i32, chunk_z: i32) -> Self {
        Self {
            x: chunk_x >> 5,
            z: chunk_z >> 5,
        }
    }

    /// Lowest chunk x and z covered by this region.
    pub fn chunk_origin(&self) -> (i32, i32) {
        (self.x * REGION_WIDTH, self.z * REGION_WIDTH)
    }

    /// Absolute chunk coordinates of slot `index`.
    pub fn chunk_at(&self, index: usize) -> (i32, i32) {
        let (origin_x, origin_z) = self.chunk_origin();
        let index = index as i32;
        (
            origin_x + index % REGION_WIDTH,
            origin_z + index / REGION_WIDTH,
        )
    }

    /// Every member chunk of this region in slot order.
    pub fn chunks(&self, world: &str) -> Vec<ChunkCoordinate> {
        (0..CHUNKS_PER_REGION)
            .map(|index| {
                let (x, z) = self.chunk_at(index);
                ChunkCoordinate::new(world, x, z)
            })
            .collect()
    }
}

impl fmt::Display for RegionCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r.{}.{}", self.x, self.z)
    }
}
