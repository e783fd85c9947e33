pub mod chunk;
pub mod error;
pub mod types;
pub mod world;

pub use chunk::{ChunkRecord, SectionRecord};
pub use error::QuarryError;
pub use types::{ChunkCoord, Result};
pub use world::WorldIndex;
