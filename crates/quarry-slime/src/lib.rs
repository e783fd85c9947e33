pub mod bitset;
pub mod bounds;
pub mod reader;
pub mod writer;

pub use bitset::OccupancyBitset;
pub use bounds::ChunkBounds;
pub use reader::{read_block, SlimeFile, SlimeHeader};
pub use writer::{SlimeSummary, SlimeWriter, DEFAULT_COMPRESSION_LEVEL, SLIME_MAGIC, SLIME_VERSION};
