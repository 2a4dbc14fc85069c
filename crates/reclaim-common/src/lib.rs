pub mod coords;
pub mod error;
pub mod types;

pub use coords::{ChunkCoordinate, RegionCoordinate, CHUNKS_PER_REGION, REGION_WIDTH};
pub use error::ReclaimError;
pub use types::{PlayerLocation, Position, Result};
