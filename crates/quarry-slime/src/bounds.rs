use quarry_common::{ChunkCoord, QuarryError, Result};

/// Smallest rectangle holding every chunk of a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBounds {
    pub min_x: i32,
    pub min_z: i32,
    pub width: u32,
    pub depth: u32,
}

impl ChunkBounds {
    /// Fails with `EmptyWorld` when there are no coordinates.
    pub fn from_coords<I: IntoIterator<Item = ChunkCoord>>(coords: I) -> Result<Self> {
        let mut coords = coords.into_iter();
        let first = coords.next().ok_or(QuarryError::EmptyWorld)?;

        let (mut min_x, mut max_x, mut min_z, mut max_z) = (first.x, first.x, first.z, first.z);
        for coord in coords {
            min_x = min_x.min(coord.x);
            max_x = max_x.max(coord.x);
            min_z = min_z.min(coord.z);
            max_z = max_z.max(coord.z);
        }

        let width = i64::from(max_x) - i64::from(min_x) + 1;
        let depth = i64::from(max_z) - i64::from(min_z) + 1;
        Ok(ChunkBounds {
            min_x,
            min_z,
            width: u32::try_from(width).map_err(|_| too_wide(width, depth))?,
            depth: u32::try_from(depth).map_err(|_| too_wide(width, depth))?,
        })
    }

    /// Position of `coord` in the row-major (z, then x) order shared by the
    /// occupancy bitset and the chunk block.
    pub fn index_of(&self, coord: ChunkCoord) -> usize {
        let rel_x = (i64::from(coord.x) - i64::from(self.min_x)) as usize;
        let rel_z = (i64::from(coord.z) - i64::from(self.min_z)) as usize;
        rel_z * self.width as usize + rel_x
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        let rel_x = i64::from(coord.x) - i64::from(self.min_x);
        let rel_z = i64::from(coord.z) - i64::from(self.min_z);
        (0..i64::from(self.width)).contains(&rel_x) && (0..i64::from(self.depth)).contains(&rel_z)
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.depth as usize
    }
}

fn too_wide(width: i64, depth: i64) -> QuarryError {
    QuarryError::ValidationError(format!("world spans {}x{} chunks", width, depth))
}
