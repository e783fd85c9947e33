use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::{GzDecoder, ZlibDecoder};
use quarry_common::{QuarryError, Result};
use quarry_nbt::{NbtFile, Tag};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Take};

/// Cells along each side of a region.
pub const REGION_WIDTH: usize = 32;
/// Region files are addressed in units of this many bytes.
pub const SECTOR_SIZE: u64 = 4096;

const TABLE_ENTRIES: usize = REGION_WIDTH * REGION_WIDTH;
/// `[payloadLength:u32][compressionScheme:u8]`
const CHUNK_HEADER_LENGTH: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionScheme {
    Gzip = 1,
    Zlib = 2,
}

impl TryFrom<u8> for CompressionScheme {
    type Error = QuarryError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(CompressionScheme::Gzip),
            2 => Ok(CompressionScheme::Zlib),
            other => Err(QuarryError::InvalidCompression(other)),
        }
    }
}

/// One lookup table word: a 24-bit sector offset and an 8-bit sector count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SectorEntry(u32);

impl SectorEntry {
    fn sector_number(self) -> u64 {
        u64::from(self.0 >> 8)
    }

    fn sector_count(self) -> u64 {
        u64::from(self.0 & 0xFF)
    }

    fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Decompressed payload of one stored chunk.
#[derive(Debug)]
pub enum ChunkStream {
    Gzip(GzDecoder<Take<Cursor<Vec<u8>>>>),
    Zlib(ZlibDecoder<Take<Cursor<Vec<u8>>>>),
}

impl ChunkStream {
    fn new(scheme: CompressionScheme, payload: Take<Cursor<Vec<u8>>>) -> Self {
        match scheme {
            CompressionScheme::Gzip => ChunkStream::Gzip(GzDecoder::new(payload)),
            CompressionScheme::Zlib => ChunkStream::Zlib(ZlibDecoder::new(payload)),
        }
    }

    pub fn scheme(&self) -> CompressionScheme {
        match self {
            ChunkStream::Gzip(_) => CompressionScheme::Gzip,
            ChunkStream::Zlib(_) => CompressionScheme::Zlib,
        }
    }
}

impl Read for ChunkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ChunkStream::Gzip(decoder) => decoder.read(buf),
            ChunkStream::Zlib(decoder) => decoder.read(buf),
        }
    }
}

/// Reads chunks out of one region file.
///
/// Every read seeks the underlying source, so a reader must not be shared
/// between threads; give each task its own.
#[derive(Debug)]
pub struct RegionReader<S> {
    name: String,
    source: S,
    table: Vec<SectorEntry>,
}

impl<S: Read + Seek> RegionReader<S> {
    /// Takes ownership of `source` and loads its lookup table.
    pub fn new(name: impl Into<String>, mut source: S) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;
        let mut words = vec![0u32; TABLE_ENTRIES];
        source.read_u32_into::<BigEndian>(&mut words)?;

        Ok(RegionReader {
            name: name.into(),
            source,
            table: words.into_iter().map(SectorEntry).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the table has an entry for cell `(x, z)`. Coordinates are
    /// region-relative, not chunk coordinates.
    pub fn chunk_exists(&self, x: usize, z: usize) -> bool {
        x < REGION_WIDTH && z < REGION_WIDTH && !self.table[x + z * REGION_WIDTH].is_empty()
    }

    /// Cells with a table entry, x-major.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..REGION_WIDTH)
            .flat_map(|x| (0..REGION_WIDTH).map(move |z| (x, z)))
            .filter(|&(x, z)| self.chunk_exists(x, z))
    }

    /// Locates cell `(x, z)` and returns its decompressed payload, ready for
    /// NBT decoding. A failure leaves the reader usable for other cells.
    pub fn read_chunk(&mut self, x: usize, z: usize) -> Result<ChunkStream> {
        if x >= REGION_WIDTH || z >= REGION_WIDTH {
            return Err(QuarryError::OutOfBounds { x, z });
        }

        let entry = self.table[x + z * REGION_WIDTH];
        if entry.sector_number() == 0 {
            return Err(QuarryError::NotFound { x, z });
        }

        self.source
            .seek(SeekFrom::Start(entry.sector_number() * SECTOR_SIZE))?;

        let capacity = entry.sector_count() * SECTOR_SIZE;
        let mut sectors = Vec::with_capacity(capacity as usize);
        self.source.by_ref().take(capacity).read_to_end(&mut sectors)?;

        let bytes_read = sectors.len() as u64;
        if bytes_read < CHUNK_HEADER_LENGTH {
            return Err(QuarryError::InvalidLength {
                declared: CHUNK_HEADER_LENGTH,
                available: bytes_read,
            });
        }

        let mut cursor = Cursor::new(sectors);
        let length = u64::from(cursor.read_u32::<BigEndian>()?);
        let scheme = cursor.read_u8()?;

        let available = bytes_read - CHUNK_HEADER_LENGTH;
        if length > available {
            return Err(QuarryError::InvalidLength {
                declared: length,
                available,
            });
        }

        let scheme = CompressionScheme::try_from(scheme)?;
        Ok(ChunkStream::new(scheme, cursor.take(length)))
    }

    /// Reads cell `(x, z)` and decodes its root tag.
    pub fn read_chunk_tag(&mut self, x: usize, z: usize) -> Result<Tag> {
        let mut stream = self.read_chunk(x, z)?;
        Ok(NbtFile::read(&mut stream)?.root)
    }
}
