pub mod reader;
pub mod world;

#[cfg(test)]
mod test_support;

pub use reader::{ChunkStream, CompressionScheme, RegionReader, REGION_WIDTH, SECTOR_SIZE};
pub use world::{load_world, read_region, FailurePolicy, LoadOptions, LoadReport, RegionFailure, RegionLoad};
