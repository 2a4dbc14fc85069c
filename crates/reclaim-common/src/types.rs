use crate::coords::ChunkCoordinate;
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, crate::error::ReclaimError>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Where a loaded player currently stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLocation {
    pub world: String,
    pub position: Position,
}

impl PlayerLocation {
    pub fn new(world: &str, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.to_owned(),
            position: Position { x, y, z },
        }
    }

    /// The chunk containing the player. Block to chunk is a floor division by 16.
    pub fn chunk(&self) -> ChunkCoordinate {
        let block_x = self.position.x.floor() as i32;
        let block_z = self.position.z.floor() as i32;
        ChunkCoordinate::new(&self.world, block_x >> 4, block_z >> 4)
    }
}
