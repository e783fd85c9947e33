use crate::bitset::OccupancyBitset;
use crate::bounds::ChunkBounds;
use crate::writer::{SLIME_MAGIC, SLIME_VERSION};
use byteorder::{BigEndian, ReadBytesExt};
use quarry_common::{ChunkCoord, QuarryError, Result};
use quarry_nbt::{NbtFile, Tag};
use std::io::{Cursor, Read};

/// Fixed fields at the start of a slime file plus the occupancy bitset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlimeHeader {
    pub version: u8,
    pub min_x: i16,
    pub min_z: i16,
    pub width: u16,
    pub depth: u16,
    pub occupancy: OccupancyBitset,
}

impl SlimeHeader {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = reader.read_u16::<BigEndian>()?;
        if magic != SLIME_MAGIC {
            return Err(QuarryError::ValidationError(format!(
                "bad slime magic {:#06x}",
                magic
            )));
        }
        let version = reader.read_u8()?;
        if version != SLIME_VERSION {
            return Err(QuarryError::ValidationError(format!(
                "unsupported slime version {}",
                version
            )));
        }

        let min_x = reader.read_i16::<BigEndian>()?;
        let min_z = reader.read_i16::<BigEndian>()?;
        let width = reader.read_u16::<BigEndian>()?;
        let depth = reader.read_u16::<BigEndian>()?;

        let bits = usize::from(width) * usize::from(depth);
        let mut bytes = vec![0u8; bits.div_ceil(8)];
        reader.read_exact(&mut bytes)?;
        let occupancy = OccupancyBitset::from_bytes(bits, bytes).ok_or_else(|| {
            QuarryError::ValidationError("occupancy bitset has the wrong size".to_owned())
        })?;

        Ok(SlimeHeader {
            version,
            min_x,
            min_z,
            width,
            depth,
            occupancy,
        })
    }

    /// Whether chunk `(x, z)` has a bit set. Chunks outside the rectangle never do.
    pub fn is_occupied(&self, x: i32, z: i32) -> bool {
        let bounds = self.bounds();
        let coord = ChunkCoord::new(x, z);
        bounds.contains(coord) && self.occupancy.get(bounds.index_of(coord))
    }

    /// The chunk rectangle this header describes.
    pub fn bounds(&self) -> ChunkBounds {
        ChunkBounds {
            min_x: i32::from(self.min_x),
            min_z: i32::from(self.min_z),
            width: u32::from(self.width),
            depth: u32::from(self.depth),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.occupancy.count_ones()
    }
}

/// Reads one `[compressedLength][uncompressedLength][zstd bytes]` frame and
/// returns the decompressed bytes.
pub fn read_block<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let compressed_length = u64::from(reader.read_u32::<BigEndian>()?);
    let uncompressed_length = reader.read_u32::<BigEndian>()? as usize;

    let mut compressed = Vec::new();
    reader
        .by_ref()
        .take(compressed_length)
        .read_to_end(&mut compressed)?;
    if (compressed.len() as u64) < compressed_length {
        return Err(QuarryError::InvalidLength {
            declared: compressed_length,
            available: compressed.len() as u64,
        });
    }

    let data = zstd::bulk::decompress(&compressed, uncompressed_length)?;
    if data.len() != uncompressed_length {
        return Err(QuarryError::ValidationError(format!(
            "block declared {} bytes but decompressed to {}",
            uncompressed_length,
            data.len()
        )));
    }
    Ok(data)
}

/// A slime file split into its blocks. Chunk data stays as raw bytes.
#[derive(Debug)]
pub struct SlimeFile {
    pub header: SlimeHeader,
    pub chunks: Vec<u8>,
    pub tile_entities: Tag,
    pub entities: Option<Tag>,
    pub extra: Vec<u8>,
}

impl SlimeFile {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let header = SlimeHeader::read(reader)?;
        let chunks = read_block(reader)?;
        let tile_entities = read_compound_block(reader)?;

        let entities = match reader.read_u8()? {
            0 => None,
            _ => Some(read_compound_block(reader)?),
        };
        let extra = read_block(reader)?;

        Ok(SlimeFile {
            header,
            chunks,
            tile_entities,
            entities,
            extra,
        })
    }
}

fn read_compound_block<R: Read>(reader: &mut R) -> Result<Tag> {
    let block = read_block(reader)?;
    Ok(NbtFile::read(&mut Cursor::new(block))?.root)
}
