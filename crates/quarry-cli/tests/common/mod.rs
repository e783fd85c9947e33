use byteorder::{BigEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use quarry_cli::ConvertConfig;
use quarry_nbt::{Compound, NbtFile, Tag};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SECTOR: usize = 4096;

pub fn section(y: i8, blocks: Vec<u8>) -> Tag {
    let mut section = Compound::new();
    section.insert("Y".to_owned(), Tag::Byte(y));
    section.insert("BlockLight".to_owned(), Tag::ByteArray(vec![0; 2048]));
    section.insert("Blocks".to_owned(), Tag::ByteArray(blocks));
    section.insert("Data".to_owned(), Tag::ByteArray(vec![0; 2048]));
    section.insert("SkyLight".to_owned(), Tag::ByteArray(vec![0; 2048]));
    Tag::Compound(section)
}

pub fn chunk(x: i32, z: i32, sections: Vec<Tag>) -> NbtFile {
    let mut level = Compound::new();
    level.insert("xPos".to_owned(), Tag::Int(x));
    level.insert("zPos".to_owned(), Tag::Int(z));
    level.insert("HeightMap".to_owned(), Tag::IntArray(vec![0; 256]));
    level.insert("Biomes".to_owned(), Tag::ByteArray(vec![0; 256]));
    level.insert("Sections".to_owned(), Tag::List(sections));
    level.insert("Entities".to_owned(), Tag::List(vec![]));
    level.insert("TileEntities".to_owned(), Tag::List(vec![]));

    let mut root = Compound::new();
    root.insert("Level".to_owned(), Tag::Compound(level));
    root.insert("DataVersion".to_owned(), Tag::Int(1343));
    NbtFile::new(String::new(), Tag::Compound(root))
}

/// A chunk with one solid stone section at y=0.
pub fn solid_chunk(x: i32, z: i32) -> NbtFile {
    chunk(x, z, vec![section(0, vec![1; 4096])])
}

/// Serializes `(cell x, cell z, chunk)` entries as a zlib-compressed region file.
pub fn region_bytes(cells: &[(usize, usize, NbtFile)]) -> Vec<u8> {
    let mut table = Vec::with_capacity(SECTOR);
    let mut words = vec![0u32; 1024];
    let mut body = Vec::new();

    for (x, z, nbt) in cells {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&nbt.to_bytes().unwrap()).unwrap();
        let payload = encoder.finish().unwrap();

        let mut cell = Vec::new();
        cell.write_u32::<BigEndian>(payload.len() as u32 + 1).unwrap();
        cell.write_u8(2).unwrap();
        cell.extend_from_slice(&payload);
        let count = cell.len().div_ceil(SECTOR);
        cell.resize(count * SECTOR, 0);

        let offset = 1 + body.len() / SECTOR;
        words[x + z * 32] = ((offset as u32) << 8) | count as u32;
        body.extend_from_slice(&cell);
    }

    for word in words {
        table.write_u32::<BigEndian>(word).unwrap();
    }
    table.extend_from_slice(&body);
    table
}

/// A world directory with a `region` folder inside a fresh temp dir.
pub struct TestWorld {
    pub dir: TempDir,
    pub world: PathBuf,
}

impl TestWorld {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let world = dir.path().join("lobby");
        fs::create_dir_all(world.join("region")).unwrap();
        TestWorld { dir, world }
    }

    pub fn add_region(&self, name: &str, bytes: &[u8]) {
        fs::write(self.world.join("region").join(name), bytes).unwrap();
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("lobby.slime")
    }
}

pub fn test_config() -> ConvertConfig {
    ConvertConfig {
        max_concurrency: 2,
        ..ConvertConfig::default()
    }
}

pub fn leftover_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".partial"))
        .collect()
}
