use crate::bitset::OccupancyBitset;
use crate::bounds::ChunkBounds;
use byteorder::{BigEndian, WriteBytesExt};
use bytes::{BufMut, BytesMut};
use quarry_common::{ChunkRecord, QuarryError, Result, WorldIndex};
use quarry_logger::log::log;
use quarry_logger::severity::LogSeverity::Debug;
use quarry_nbt::{Compound, NbtFile, Tag};
use std::io::Write;

pub const SLIME_MAGIC: u16 = 0xB10B;
pub const SLIME_VERSION: u8 = 3;
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Marks the entities block as present.
const ENTITIES_PRESENT: u8 = 1;

/// What went into a written world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlimeSummary {
    pub bounds: ChunkBounds,
    pub chunks: usize,
    pub sections: usize,
    pub tile_entities: usize,
    pub entities: usize,
    /// Compressed and uncompressed size of the chunk block.
    pub chunk_block: (usize, usize),
}

/// Writes a `WorldIndex` as a slime world.
///
/// Layout: header, occupancy bitset, then four framed zstd blocks (chunks,
/// tile entities, a presence byte plus entities, and an empty extra block).
/// Nothing is buffered past a failed write, so on error whatever reached the
/// sink is incomplete and must be thrown away.
pub struct SlimeWriter<W> {
    writer: W,
    compression_level: i32,
}

impl<W: Write> SlimeWriter<W> {
    pub fn new(writer: W) -> Self {
        SlimeWriter {
            writer,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_world(&mut self, world: WorldIndex) -> Result<SlimeSummary> {
        let bounds = ChunkBounds::from_coords(world.coords())?;
        check_header_fits(&bounds)?;

        let mut records = canonical_order(world, &bounds);

        let mut occupancy = OccupancyBitset::new(bounds.area());
        for record in &records {
            occupancy.set(bounds.index_of(record.coord));
        }
        self.write_header(&bounds, &occupancy)?;

        let chunk_block = encode_chunks(&records);
        let chunk_block_sizes = self.write_compressed(&chunk_block)?;

        let tile_entities: Vec<Tag> = records
            .iter_mut()
            .flat_map(|record| std::mem::take(&mut record.tile_entities))
            .collect();
        let entities: Vec<Tag> = records
            .iter_mut()
            .flat_map(|record| std::mem::take(&mut record.entities))
            .collect();
        let summary = SlimeSummary {
            bounds,
            chunks: records.len(),
            sections: records.iter().map(ChunkRecord::section_count).sum(),
            tile_entities: tile_entities.len(),
            entities: entities.len(),
            chunk_block: chunk_block_sizes,
        };

        self.write_compressed(&encode_tag_list("tiles", tile_entities)?)?;

        self.writer.write_u8(ENTITIES_PRESENT)?;
        self.write_compressed(&encode_tag_list("entities", entities)?)?;

        // Reserved for extra world data; always an empty stream.
        self.write_compressed(&[])?;

        self.writer.flush()?;
        Ok(summary)
    }

    fn write_header(&mut self, bounds: &ChunkBounds, occupancy: &OccupancyBitset) -> Result<()> {
        self.writer.write_u16::<BigEndian>(SLIME_MAGIC)?;
        self.writer.write_u8(SLIME_VERSION)?;
        self.writer.write_i16::<BigEndian>(bounds.min_x as i16)?;
        self.writer.write_i16::<BigEndian>(bounds.min_z as i16)?;
        self.writer.write_u16::<BigEndian>(bounds.width as u16)?;
        self.writer.write_u16::<BigEndian>(bounds.depth as u16)?;
        self.writer.write_all(occupancy.as_bytes())?;
        Ok(())
    }

    /// Writes `[compressedLength:u32][uncompressedLength:u32][zstd bytes]`.
    fn write_compressed(&mut self, data: &[u8]) -> Result<(usize, usize)> {
        let compressed = zstd::bulk::compress(data, self.compression_level)?;
        log(
            format!(
                "compressed {} bytes, uncompressed {}",
                compressed.len(),
                data.len()
            ),
            Debug,
        );

        self.writer
            .write_u32::<BigEndian>(frame_length(compressed.len())?)?;
        self.writer.write_u32::<BigEndian>(frame_length(data.len())?)?;
        self.writer.write_all(&compressed)?;
        Ok((compressed.len(), data.len()))
    }
}

/// The header stores the origin as i16 and the extent as u16.
fn check_header_fits(bounds: &ChunkBounds) -> Result<()> {
    let origin_fits =
        i16::try_from(bounds.min_x).is_ok() && i16::try_from(bounds.min_z).is_ok();
    let extent_fits = u16::try_from(bounds.width).is_ok() && u16::try_from(bounds.depth).is_ok();
    if !origin_fits || !extent_fits {
        return Err(QuarryError::ValidationError(format!(
            "world at {},{} spanning {}x{} chunks does not fit a slime header",
            bounds.min_x, bounds.min_z, bounds.width, bounds.depth
        )));
    }
    Ok(())
}

fn frame_length(length: usize) -> Result<u32> {
    u32::try_from(length).map_err(|_| {
        QuarryError::ValidationError(format!("block of {} bytes is too large to frame", length))
    })
}

/// Sorts the world's chunks by their occupancy bit index.
pub fn canonical_order(world: WorldIndex, bounds: &ChunkBounds) -> Vec<ChunkRecord> {
    let mut records: Vec<ChunkRecord> = world.into_iter().map(|(_, record)| record).collect();
    records.sort_by_key(|record| bounds.index_of(record.coord));
    records
}

/// Serializes chunk columns back to back, uncompressed.
pub fn encode_chunks(records: &[ChunkRecord]) -> BytesMut {
    let mut buffer = BytesMut::new();
    for record in records {
        // 1. Height map (256 x Int)
        for &height in &record.height_map {
            buffer.put_i32(height);
        }

        // 2. Biomes (256 x Byte)
        buffer.put_slice(&record.biomes);

        // 3. Section bit mask (Short)
        buffer.put_u16(record.section_mask());

        // 4. Sections, ascending y
        for section in record.sections() {
            buffer.put_slice(&section.block_light);
            buffer.put_slice(&section.blocks);
            buffer.put_slice(&section.data);
            buffer.put_slice(&section.sky_light);
            // Reserved per-section extension, always zero in version 3.
            buffer.put_u16(0);
        }
    }
    buffer
}

/// A root compound holding one list entry.
fn encode_tag_list(name: &str, tags: Vec<Tag>) -> Result<Vec<u8>> {
    let mut compound = Compound::new();
    compound.insert(name.to_owned(), Tag::List(tags));
    Ok(NbtFile::new(String::new(), Tag::Compound(compound)).to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SlimeFile;
    use assert_matches::assert_matches;
    use quarry_common::{ChunkCoord, SectionRecord};
    use quarry_nbt::NbtError;
    use std::io::Cursor;

    fn section(y: u8) -> SectionRecord {
        SectionRecord {
            y,
            block_light: vec![0; 2048],
            blocks: vec![0; 2048],
            data: vec![0; 2048],
            sky_light: vec![0; 2048],
        }
    }

    fn record(x: i32, z: i32, sections: &[u8]) -> ChunkRecord {
        let mut record = ChunkRecord::new(ChunkCoord::new(x, z));
        for &y in sections {
            record.set_section(section(y)).unwrap();
        }
        record
    }

    fn write(world: WorldIndex) -> (Vec<u8>, SlimeSummary) {
        let mut writer = SlimeWriter::new(Vec::new());
        let summary = writer.write_world(world).unwrap();
        (writer.into_inner(), summary)
    }

    #[test]
    fn test_single_chunk_header() {
        let world: WorldIndex = vec![record(5, 5, &[0])].into_iter().collect();
        let (bytes, summary) = write(world);

        assert_eq!(
            &bytes[..12],
            &[0xB1, 0x0B, 3, 0, 5, 0, 5, 0, 1, 0, 1, 0x01]
        );
        assert_eq!(summary.chunks, 1);
        assert_eq!(summary.sections, 1);

        let file = SlimeFile::read(&mut Cursor::new(bytes)).unwrap();
        // 256 ints + 256 biomes, then the section mask
        assert_eq!(&file.chunks[1280..1282], &[0x00, 0x01]);
        assert_eq!(file.chunks.len(), 1280 + 2 + 4 * 2048 + 2);
    }

    #[test]
    fn test_occupancy_matches_keys() {
        let coords = [(-2, 3), (0, 3), (1, 4), (-2, 6), (1, 6)];
        let world: WorldIndex = coords.iter().map(|&(x, z)| record(x, z, &[1])).collect();
        let (bytes, summary) = write(world);

        let header = SlimeFile::read(&mut Cursor::new(bytes)).unwrap().header;
        assert_eq!((header.min_x, header.min_z), (-2, 3));
        assert_eq!((header.width, header.depth), (4, 4));
        assert_eq!(summary.bounds.area(), 16);

        for z in 3..7 {
            for x in -2..2 {
                let expected = coords.contains(&(x, z));
                assert_eq!(header.is_occupied(x, z), expected, "chunk {},{}", x, z);
            }
        }
        assert_eq!(header.occupancy.count_ones(), coords.len());
    }

    #[test]
    fn test_canonical_order_follows_bit_index() {
        let coords = [(3, 1), (0, 2), (1, 1), (2, 0), (0, 0)];
        let world: WorldIndex = coords.iter().map(|&(x, z)| record(x, z, &[0])).collect();
        let bounds = ChunkBounds::from_coords(world.coords()).unwrap();

        let ordered: Vec<ChunkCoord> = canonical_order(world, &bounds)
            .iter()
            .map(|record| record.coord)
            .collect();
        assert_eq!(
            ordered,
            vec![
                ChunkCoord::new(0, 0),
                ChunkCoord::new(2, 0),
                ChunkCoord::new(1, 1),
                ChunkCoord::new(3, 1),
                ChunkCoord::new(0, 2),
            ]
        );
        let keys: Vec<usize> = ordered.iter().map(|&c| bounds.index_of(c)).collect();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_chunk_payload_layout() {
        let mut chunk = record(0, 0, &[4, 1]);
        chunk.height_map = (0..256).collect();
        chunk.biomes = vec![7; 256];
        let encoded = encode_chunks(&[chunk]);

        assert_eq!(&encoded[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&encoded[1020..1024], &[0, 0, 0, 255]);
        assert_eq!(encoded[1024], 7);
        assert_eq!(&encoded[1280..1282], &[0b0000_0000, 0b0001_0010]);

        let section_length = 4 * 2048 + 2;
        assert_eq!(encoded.len(), 1282 + 2 * section_length);
        // reserved marker closes each section
        assert_eq!(&encoded[1282 + section_length - 2..1282 + section_length], &[0, 0]);
    }

    #[test]
    fn test_entity_blocks_collect_every_chunk() {
        let mut first = record(0, 0, &[0]);
        first.tile_entities = vec![Tag::Compound(Compound::new()), Tag::Compound(Compound::new())];
        let mut second = record(1, 0, &[0]);
        second.entities = vec![Tag::Compound(Compound::new())];
        let world: WorldIndex = vec![first, second].into_iter().collect();

        let (bytes, summary) = write(world);
        assert_eq!(summary.tile_entities, 2);
        assert_eq!(summary.entities, 1);

        let file = SlimeFile::read(&mut Cursor::new(bytes)).unwrap();
        let tiles = file.tile_entities.as_compound().unwrap()["tiles"].as_list().unwrap();
        assert_eq!(tiles.len(), 2);
        let entities = file.entities.unwrap();
        let entities = entities.as_compound().unwrap()["entities"].as_list().unwrap();
        assert_eq!(entities.len(), 1);
        assert!(file.extra.is_empty());
    }

    /// Serialized tile entity whose entries are in no particular key order.
    fn tile_entity_bytes() -> Vec<u8> {
        let mut tile = Compound::new();
        for (i, key) in ["id", "x", "y", "z", "Items", "Lock", "CustomName", "Levels", "Primary", "Secondary", "Book", "Page"]
            .iter()
            .enumerate()
        {
            tile.insert((*key).to_owned(), Tag::Int(i as i32));
        }
        NbtFile::new(String::new(), Tag::Compound(tile)).to_bytes().unwrap()
    }

    #[test]
    fn test_same_input_writes_same_bytes() {
        let source = tile_entity_bytes();
        let convert = || {
            let tile = NbtFile::read(&mut Cursor::new(source.clone())).unwrap().root;
            let mut chunk = record(0, 0, &[0]);
            chunk.tile_entities = vec![tile];
            let world: WorldIndex = vec![chunk, record(2, 1, &[3])].into_iter().collect();
            write(world).0
        };

        let first = convert();
        for _ in 0..7 {
            assert_eq!(convert(), first);
        }

        let file = SlimeFile::read(&mut Cursor::new(first)).unwrap();
        let tiles = file.tile_entities.as_compound().unwrap()["tiles"].as_list().unwrap();
        let mut written = Vec::new();
        tiles[0].write(&mut written, "").unwrap();
        assert_eq!(written, source);
    }

    #[test]
    fn test_no_entities_writes_empty_lists() {
        let world: WorldIndex = vec![record(0, 0, &[0])].into_iter().collect();
        let (bytes, _) = write(world);
        let file = SlimeFile::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(
            file.tile_entities.as_compound().unwrap()["tiles"],
            Tag::List(vec![])
        );
    }

    #[test]
    fn test_empty_world_is_rejected() {
        let mut writer = SlimeWriter::new(Vec::new());
        assert_matches!(
            writer.write_world(WorldIndex::new()),
            Err(QuarryError::EmptyWorld)
        );
        assert!(writer.into_inner().is_empty());
    }

    #[test]
    fn test_world_too_wide_for_header() {
        let world: WorldIndex = vec![record(0, 0, &[0]), record(70_000, 0, &[0])]
            .into_iter()
            .collect();
        assert_matches!(
            SlimeWriter::new(Vec::new()).write_world(world),
            Err(QuarryError::ValidationError(_))
        );
    }

    #[test]
    fn test_mixed_entity_list_fails() {
        let mut chunk = record(0, 0, &[0]);
        chunk.entities = vec![Tag::Int(1), Tag::String("two".to_owned())];
        let world: WorldIndex = vec![chunk].into_iter().collect();
        assert_matches!(
            SlimeWriter::new(Vec::new()).write_world(world),
            Err(QuarryError::NbtError(NbtError::UnsupportedType(_)))
        );
    }
}
