use quarry_nbt::NbtError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuarryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("NBT error: {0}")]
    NbtError(#[from] NbtError),
    #[error("no chunk stored at region cell {x},{z}")]
    NotFound { x: usize, z: usize },
    #[error("region cell {x},{z} is outside the 32x32 grid")]
    OutOfBounds { x: usize, z: usize },
    #[error("{declared} bytes declared but only {available} available")]
    InvalidLength { declared: u64, available: u64 },
    #[error("invalid compression scheme: {0}")]
    InvalidCompression(u8),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("no chunks survived loading, nothing to write")]
    EmptyWorld,
    #[error("config error: {0}")]
    ConfigError(String),
}
