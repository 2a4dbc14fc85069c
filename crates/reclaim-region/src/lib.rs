//! Anvil region files as far as reclamation needs them: which chunk slots are
//! occupied, whether an occupied slot can be read back, and where a world keeps them.

#[cfg(any(test, feature = "test-util"))]
pub mod builder;
pub mod file;
pub mod folder;
pub mod header;
pub mod level;

#[cfg(any(test, feature = "test-util"))]
pub use builder::RegionBuilder;
pub use file::{ChunkPresence, RegionFile};
pub use folder::{find_region_folder, list_regions, parse_region_file_name, region_file_name};
pub use header::{ChunkLocation, RegionHeader, HEADER_SIZE, SECTOR_SIZE};
pub use level::{read_spawn, spawn_chunk};
