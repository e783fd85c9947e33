use crate::reader::{CompressionScheme, SECTOR_SIZE};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use quarry_nbt::{Compound, NbtFile, Tag};
use std::io::Write;

/// Assembles a region file in memory, one cell per call, sectors in call order.
#[derive(Default)]
pub struct RegionBuilder {
    cells: Vec<(usize, usize, Vec<u8>)>,
}

impl RegionBuilder {
    pub fn new() -> Self {
        RegionBuilder::default()
    }

    pub fn chunk(self, x: usize, z: usize, scheme: CompressionScheme, nbt: &NbtFile) -> Self {
        let payload = compress(scheme, &nbt.to_bytes().unwrap());
        let declared = payload.len() as u32 + 1;
        self.raw_cell_with_length(x, z, scheme as u8, payload, declared)
    }

    /// Stores a valid payload under a made-up length header.
    pub fn declared_length(
        self,
        x: usize,
        z: usize,
        scheme: CompressionScheme,
        nbt: &NbtFile,
        declared: u32,
    ) -> Self {
        let payload = compress(scheme, &nbt.to_bytes().unwrap());
        self.raw_cell_with_length(x, z, scheme as u8, payload, declared)
    }

    pub fn raw_cell(self, x: usize, z: usize, scheme: u8, payload: Vec<u8>) -> Self {
        let declared = payload.len() as u32 + 1;
        self.raw_cell_with_length(x, z, scheme, payload, declared)
    }

    fn raw_cell_with_length(
        mut self,
        x: usize,
        z: usize,
        scheme: u8,
        payload: Vec<u8>,
        declared: u32,
    ) -> Self {
        let mut body = Vec::with_capacity(payload.len() + 5);
        body.extend_from_slice(&declared.to_be_bytes());
        body.push(scheme);
        body.extend_from_slice(&payload);
        self.cells.push((x, z, body));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let sector = SECTOR_SIZE as usize;
        let mut table = vec![0u8; sector];
        let mut sectors = Vec::new();
        let mut next_sector = 1usize;

        for (x, z, mut body) in self.cells {
            let count = (body.len() + 1).div_ceil(sector);
            body.resize(count * sector, 0);
            let word = ((next_sector as u32) << 8) | count as u32;
            let index = (x + z * 32) * 4;
            table[index..index + 4].copy_from_slice(&word.to_be_bytes());
            sectors.extend_from_slice(&body);
            next_sector += count;
        }

        table.extend_from_slice(&sectors);
        table
    }
}

fn compress(scheme: CompressionScheme, bytes: &[u8]) -> Vec<u8> {
    match scheme {
        CompressionScheme::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(bytes).unwrap();
            encoder.finish().unwrap()
        }
        CompressionScheme::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(bytes).unwrap();
            encoder.finish().unwrap()
        }
    }
}

/// A stored chunk at absolute `(x, z)` with `sections` solid sections from y = 0 up.
pub fn chunk_nbt(x: i32, z: i32, sections: usize) -> NbtFile {
    let sections = (0..sections)
        .map(|y| {
            let mut section = Compound::new();
            section.insert("Y".to_owned(), Tag::Byte(y as i8));
            section.insert("BlockLight".to_owned(), Tag::ByteArray(vec![0; 2048]));
            section.insert("Blocks".to_owned(), Tag::ByteArray(vec![1; 4096]));
            section.insert("Data".to_owned(), Tag::ByteArray(vec![0; 2048]));
            section.insert("SkyLight".to_owned(), Tag::ByteArray(vec![0xFF; 2048]));
            Tag::Compound(section)
        })
        .collect();

    let mut level = Compound::new();
    level.insert("xPos".to_owned(), Tag::Int(x));
    level.insert("zPos".to_owned(), Tag::Int(z));
    level.insert("HeightMap".to_owned(), Tag::IntArray(vec![16; 256]));
    level.insert("Biomes".to_owned(), Tag::ByteArray(vec![1; 256]));
    level.insert("Sections".to_owned(), Tag::List(sections));
    level.insert("Entities".to_owned(), Tag::List(vec![]));
    level.insert("TileEntities".to_owned(), Tag::List(vec![]));

    let mut root = Compound::new();
    root.insert("Level".to_owned(), Tag::Compound(level));
    NbtFile::new(String::new(), Tag::Compound(root))
}
