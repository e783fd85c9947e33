use crate::chunk::ChunkRecord;
use crate::types::ChunkCoord;
use std::collections::hash_map::{self, HashMap};

/// Every loaded chunk of a world, keyed by absolute coordinate.
#[derive(Debug, Default)]
pub struct WorldIndex {
    chunks: HashMap<ChunkCoord, ChunkRecord>,
}

impl WorldIndex {
    pub fn new() -> Self {
        WorldIndex {
            chunks: HashMap::new(),
        }
    }

    /// Inserts a record under its own coordinate, returning the one it replaced.
    pub fn insert(&mut self, record: ChunkRecord) -> Option<ChunkRecord> {
        self.chunks.insert(record.coord, record)
    }

    /// Moves every chunk of `partial` in. Later entries win; returns the
    /// coordinates that were already present.
    pub fn merge(&mut self, partial: HashMap<ChunkCoord, ChunkRecord>) -> Vec<ChunkCoord> {
        let mut collisions = Vec::new();
        for (coord, record) in partial {
            if self.chunks.insert(coord, record).is_some() {
                collisions.push(coord);
            }
        }
        collisions
    }

    pub fn get(&self, coord: &ChunkCoord) -> Option<&ChunkRecord> {
        self.chunks.get(coord)
    }

    pub fn contains(&self, coord: &ChunkCoord) -> bool {
        self.chunks.contains_key(coord)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }
}

impl IntoIterator for WorldIndex {
    type Item = (ChunkCoord, ChunkRecord);
    type IntoIter = hash_map::IntoIter<ChunkCoord, ChunkRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}

impl FromIterator<ChunkRecord> for WorldIndex {
    fn from_iter<I: IntoIterator<Item = ChunkRecord>>(iter: I) -> Self {
        let mut world = WorldIndex::new();
        for record in iter {
            world.insert(record);
        }
        world
    }
}
