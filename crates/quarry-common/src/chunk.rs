use crate::error::QuarryError;
use crate::types::{ChunkCoord, Result};
use quarry_nbt::{CompoundReader, Tag, Tolerance};

/// Vertical sections in a chunk column.
pub const SECTION_COUNT: usize = 16;
/// Columns in a 16x16 chunk footprint; height map and biome arrays hold one entry each.
pub const COLUMN_COUNT: usize = 256;
/// Block ids in a full section.
pub const SECTION_VOLUME: usize = 4096;

const ROOT_FIELDS: &[&str] = &["Level", "DataVersion"];
const LEVEL_FIELDS: &[&str] = &[
    "xPos",
    "zPos",
    "HeightMap",
    "Biomes",
    "Sections",
    "Entities",
    "TileEntities",
];
const SECTION_FIELDS: &[&str] = &["Y", "BlockLight", "Blocks", "Data", "SkyLight"];

/// One 16-block-tall slab of a chunk. The byte planes are kept exactly as the
/// source stored them.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub y: u8,
    /// Nibble array, two cells per byte.
    pub block_light: Vec<u8>,
    pub blocks: Vec<u8>,
    pub data: Vec<u8>,
    /// Nibble array, two cells per byte.
    pub sky_light: Vec<u8>,
}

impl SectionRecord {
    /// A full section made only of air carries nothing worth converting.
    pub fn is_empty(&self) -> bool {
        self.blocks.len() == SECTION_VOLUME && self.blocks.iter().all(|&id| id == 0)
    }

    fn from_tag(tag: Tag, tolerance: Tolerance) -> Result<Self> {
        let mut section = CompoundReader::new("Level.Sections[]", tag, tolerance)?;
        section.expect_only(SECTION_FIELDS)?;

        let y = section.take_byte("Y")?;
        if !(0..SECTION_COUNT as i8).contains(&y) {
            return Err(QuarryError::ValidationError(format!(
                "section index {} outside 0..{}",
                y, SECTION_COUNT
            )));
        }

        Ok(SectionRecord {
            y: y as u8,
            block_light: section.take_byte_array("BlockLight")?,
            blocks: section.take_byte_array("Blocks")?,
            data: section.take_byte_array("Data")?,
            sky_light: section.take_byte_array("SkyLight")?,
        })
    }
}

/// The decoded contents of one chunk column.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub coord: ChunkCoord,
    pub height_map: Vec<i32>,
    pub biomes: Vec<u8>,
    sections: [Option<SectionRecord>; SECTION_COUNT],
    pub entities: Vec<Tag>,
    pub tile_entities: Vec<Tag>,
}

impl ChunkRecord {
    pub fn new(coord: ChunkCoord) -> Self {
        ChunkRecord {
            coord,
            height_map: vec![0; COLUMN_COUNT],
            biomes: vec![0; COLUMN_COUNT],
            sections: Default::default(),
            entities: Vec::new(),
            tile_entities: Vec::new(),
        }
    }

    /// Decodes the root compound of a stored chunk and checks its fixed-length arrays.
    pub fn decode(root: Tag, tolerance: Tolerance) -> Result<Self> {
        let record = ChunkRecord::from_nbt(root, tolerance)?;
        record.validate()?;
        Ok(record)
    }

    fn from_nbt(root: Tag, tolerance: Tolerance) -> Result<Self> {
        let mut root = CompoundReader::new("", root, tolerance)?;
        root.expect_only(ROOT_FIELDS)?;

        let mut level = root.take_compound("Level")?;
        level.expect_only(LEVEL_FIELDS)?;

        let coord = ChunkCoord::new(level.take_int("xPos")?, level.take_int("zPos")?);
        let mut record = ChunkRecord::new(coord);
        record.height_map = level.take_int_array("HeightMap")?;
        record.biomes = level.take_byte_array("Biomes")?;
        record.entities = level.take_list_or_empty("Entities")?;
        record.tile_entities = level.take_list_or_empty("TileEntities")?;

        for tag in level.take_list_or_empty("Sections")? {
            let section = SectionRecord::from_tag(tag, tolerance)?;
            if record.get_section(section.y as usize).is_some() {
                return Err(QuarryError::ValidationError(format!(
                    "chunk {} stores section {} twice",
                    coord, section.y
                )));
            }
            record.set_section(section)?;
        }

        Ok(record)
    }

    pub fn validate(&self) -> Result<()> {
        if self.height_map.len() != COLUMN_COUNT {
            return Err(QuarryError::ValidationError(format!(
                "chunk {} height map has {} entries, expected {}",
                self.coord,
                self.height_map.len(),
                COLUMN_COUNT
            )));
        }
        if self.biomes.len() != COLUMN_COUNT {
            return Err(QuarryError::ValidationError(format!(
                "chunk {} biome array has {} entries, expected {}",
                self.coord,
                self.biomes.len(),
                COLUMN_COUNT
            )));
        }
        Ok(())
    }

    pub fn get_section(&self, section_y: usize) -> Option<&SectionRecord> {
        self.sections.get(section_y)?.as_ref()
    }

    /// Stores a section at its own `y`, replacing whatever was there.
    pub fn set_section(&mut self, section: SectionRecord) -> Result<()> {
        let y = section.y as usize;
        let slot = self.sections.get_mut(y).ok_or_else(|| {
            QuarryError::ValidationError(format!("section index {} outside 0..{}", y, SECTION_COUNT))
        })?;
        *slot = Some(section);
        Ok(())
    }

    /// Present sections in ascending `y`.
    pub fn sections(&self) -> impl Iterator<Item = &SectionRecord> {
        self.sections.iter().flatten()
    }

    pub fn section_count(&self) -> usize {
        self.sections().count()
    }

    /// Bit `y` is set for every present section.
    pub fn section_mask(&self) -> u16 {
        self.sections()
            .fold(0u16, |mask, section| mask | (1 << section.y))
    }

    /// Drops all-air sections, returning how many were removed.
    pub fn drop_empty_sections(&mut self) -> usize {
        let mut dropped = 0;
        for slot in self.sections.iter_mut() {
            if slot.as_ref().is_some_and(SectionRecord::is_empty) {
                *slot = None;
                dropped += 1;
            }
        }
        dropped
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(Option::is_none)
    }
}
