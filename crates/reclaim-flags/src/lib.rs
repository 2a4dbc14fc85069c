pub mod flag;
pub mod persist;
pub mod store;

pub use flag::ChunkFlag;
pub use store::FlagStore;
