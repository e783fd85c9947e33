use crate::reader::RegionReader;
use futures::future::join_all;
use quarry_common::{ChunkCoord, ChunkRecord, QuarryError, Result, WorldIndex};
use quarry_logger::log::log;
use quarry_logger::severity::LogSeverity::{Debug, Info, Warning};
use quarry_nbt::Tolerance;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Seek};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// How far a bad chunk reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// One bad chunk discards everything read from its region.
    #[default]
    DropRegion,
    /// A bad chunk is skipped; the rest of its region is kept.
    SkipChunk,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub tolerance: Tolerance,
    pub failure_policy: FailurePolicy,
    /// Regions decoded at the same time.
    pub max_concurrency: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            tolerance: Tolerance::default(),
            failure_policy: FailurePolicy::default(),
            max_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// Chunks decoded from one region file, keyed by absolute coordinate.
#[derive(Debug)]
pub struct RegionLoad {
    pub name: String,
    pub chunks: HashMap<ChunkCoord, ChunkRecord>,
    /// Chunks dropped under `FailurePolicy::SkipChunk`.
    pub skipped: usize,
}

/// A region that could not be loaded, with the cell that broke it if any.
#[derive(Debug)]
pub struct RegionFailure {
    pub name: String,
    pub cell: Option<(usize, usize)>,
    pub error: QuarryError,
}

impl fmt::Display for RegionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell {
            Some((x, z)) => write!(
                f,
                "could not read chunk {},{} in {}: {}",
                x, z, self.name, self.error
            ),
            None => write!(f, "could not read {}: {}", self.name, self.error),
        }
    }
}

impl std::error::Error for RegionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub world: WorldIndex,
    pub regions_loaded: usize,
    pub failed: Vec<RegionFailure>,
    pub chunks_skipped: usize,
}

/// Decodes every chunk of one region file.
pub fn read_region<S: Read + Seek>(
    name: &str,
    source: S,
    options: &LoadOptions,
) -> std::result::Result<RegionLoad, RegionFailure> {
    let failure = |cell, error| RegionFailure {
        name: name.to_owned(),
        cell,
        error,
    };

    let mut reader = RegionReader::new(name, source).map_err(|e| failure(None, e))?;
    let mut chunks = HashMap::new();
    let mut skipped = 0;

    let cells: Vec<(usize, usize)> = reader.occupied_cells().collect();
    for (x, z) in cells {
        match read_cell(&mut reader, x, z, options.tolerance) {
            Ok(Some(record)) => {
                chunks.insert(record.coord, record);
            }
            Ok(None) => {}
            Err(error) => match options.failure_policy {
                FailurePolicy::DropRegion => return Err(failure(Some((x, z)), error)),
                FailurePolicy::SkipChunk => {
                    log(
                        format!("Skipping {}", failure(Some((x, z)), error)),
                        Warning,
                    );
                    skipped += 1;
                }
            },
        }
    }

    Ok(RegionLoad {
        name: reader.name().to_owned(),
        chunks,
        skipped,
    })
}

/// Reads one cell into a record. All-air chunks come back as `None`.
fn read_cell<S: Read + Seek>(
    reader: &mut RegionReader<S>,
    x: usize,
    z: usize,
    tolerance: Tolerance,
) -> Result<Option<ChunkRecord>> {
    let root = reader.read_chunk_tag(x, z)?;
    let mut record = ChunkRecord::decode(root, tolerance)?;
    record.drop_empty_sections();
    if record.is_empty() {
        return Ok(None);
    }
    Ok(Some(record))
}

/// Decodes every source concurrently and merges the results.
///
/// Each source gets its own blocking task; at most `max_concurrency` run at
/// once. A region that fails is reported in `LoadReport::failed` and left out
/// of the world, the rest still load. Merging only starts once every task has
/// finished, so the result does not depend on completion order unless two
/// regions claim the same chunk, in which case the later source wins.
pub async fn load_world<S>(sources: Vec<(String, S)>, options: LoadOptions) -> LoadReport
where
    S: Read + Seek + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
    let options = Arc::new(options);

    let tasks = sources.into_iter().map(|(name, source)| {
        let permits = Arc::clone(&permits);
        let options = Arc::clone(&options);
        async move {
            // The semaphore is never closed; without a permit the task just runs unbounded.
            let _permit = permits.acquire_owned().await.ok();
            let task_name = name.clone();
            tokio::task::spawn_blocking(move || read_region(&name, source, &options))
                .await
                .unwrap_or_else(|join_error| {
                    Err(RegionFailure {
                        name: task_name,
                        cell: None,
                        error: QuarryError::IoError(io::Error::new(
                            io::ErrorKind::Other,
                            format!("region task failed: {}", join_error),
                        )),
                    })
                })
        }
    });

    let results = join_all(tasks).await;

    let mut report = LoadReport::default();
    for result in results {
        match result {
            Ok(region) => {
                log(
                    format!("Loaded {} chunks from {}", region.chunks.len(), region.name),
                    Debug,
                );
                for coord in report.world.merge(region.chunks) {
                    log(
                        format!(
                            "Chunk {} appears in more than one region, keeping the copy from {}",
                            coord, region.name
                        ),
                        Debug,
                    );
                }
                report.regions_loaded += 1;
                report.chunks_skipped += region.skipped;
            }
            Err(failure) => {
                log(format!("Unable to read chunks: {}", failure), Warning);
                report.failed.push(failure);
            }
        }
    }

    log(
        format!(
            "Discovered {} chunks in {} regions ({} regions failed)",
            report.world.len(),
            report.regions_loaded,
            report.failed.len()
        ),
        Info,
    );
    report
}
