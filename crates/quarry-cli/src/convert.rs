use crate::config::ConvertConfig;
use quarry_common::{QuarryError, Result, WorldIndex};
use quarry_logger::log::log;
use quarry_logger::severity::LogSeverity::{Info, Warning};
use quarry_region::load_world;
use quarry_slime::{SlimeFile, SlimeHeader, SlimeSummary, SlimeWriter};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome of a finished conversion.
#[derive(Debug)]
pub struct ConversionReport {
    pub output: PathBuf,
    pub regions_loaded: usize,
    pub regions_failed: usize,
    pub chunks_skipped: usize,
    pub summary: SlimeSummary,
    pub load_time: Duration,
    pub save_time: Duration,
}

/// `<parent>/<world-name>.slime` next to the world directory.
pub fn default_output(world_dir: &Path) -> Result<PathBuf> {
    let name = world_dir.file_name().ok_or_else(|| {
        QuarryError::ConfigError(format!(
            "cannot derive an output name from {}",
            world_dir.display()
        ))
    })?;
    let mut file_name = name.to_owned();
    file_name.push(".slime");
    let parent = world_dir.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(file_name))
}

/// Region files in `region_dir` with the given extension, sorted by name.
pub fn discover_regions(region_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(region_dir).map_err(|e| {
        io::Error::new(e.kind(), format!("{}: {}", region_dir.display(), e))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let matches = path.extension().is_some_and(|ext| ext == extension);
        if matches && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Opens every path. Files that cannot be opened are reported and left out.
pub fn open_regions(paths: &[PathBuf]) -> Vec<(String, File)> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match File::open(path) {
            Ok(file) => sources.push((name, file)),
            Err(e) => log(format!("Unable to open {}: {}", path.display(), e), Warning),
        }
    }
    sources
}

/// Loads the world under `world_dir` and writes it to `output`.
pub async fn convert_world(
    world_dir: &Path,
    output: &Path,
    config: &ConvertConfig,
) -> Result<ConversionReport> {
    let region_dir = world_dir.join(&config.region_dir);
    let paths = discover_regions(&region_dir, &config.extension)?;
    log(
        format!("Found {} region files in {}", paths.len(), region_dir.display()),
        Info,
    );

    let start_load = Instant::now();
    let report = load_world(open_regions(&paths), config.load_options()).await;
    let load_time = start_load.elapsed();
    log(
        format!("Region world loaded in {}ms", load_time.as_millis()),
        Info,
    );

    let start_save = Instant::now();
    let world = report.world;
    let target = output.to_path_buf();
    let level = config.compression_level;
    let summary = tokio::task::spawn_blocking(move || write_atomically(world, &target, level))
        .await
        .map_err(|join_error| {
            QuarryError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("write task failed: {}", join_error),
            ))
        })??;
    let save_time = start_save.elapsed();
    log(
        format!(
            "Slime world with {} chunks saved to {} in {}ms",
            summary.chunks,
            output.display(),
            save_time.as_millis()
        ),
        Info,
    );

    Ok(ConversionReport {
        output: output.to_path_buf(),
        regions_loaded: report.regions_loaded,
        regions_failed: report.failed.len(),
        chunks_skipped: report.chunks_skipped,
        summary,
        load_time,
        save_time,
    })
}

/// Sibling path the output is written to before it is renamed into place.
pub fn partial_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

/// Writes the world next to `output` and renames it into place once complete.
/// On failure nothing is left at either path.
pub fn write_atomically(
    world: WorldIndex,
    output: &Path,
    compression_level: i32,
) -> Result<SlimeSummary> {
    // Checked up front so an empty world never creates a file.
    if world.is_empty() {
        return Err(QuarryError::EmptyWorld);
    }

    let partial = partial_path(output);
    let result = write_file(world, &partial, compression_level)
        .and_then(|summary| fs::rename(&partial, output).map(|_| summary).map_err(Into::into));

    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn write_file(world: WorldIndex, path: &Path, compression_level: i32) -> Result<SlimeSummary> {
    let file = File::create(path)?;
    let mut writer =
        SlimeWriter::new(BufWriter::new(file)).with_compression_level(compression_level);
    let summary = writer.write_world(world)?;

    let mut buffered = writer.into_inner();
    buffered.flush()?;
    let file = buffered.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(summary)
}

/// Re-reads a written file and checks it holds `expected_chunks` chunks.
pub fn verify_output(path: &Path, expected_chunks: usize) -> Result<SlimeHeader> {
    let mut reader = BufReader::new(File::open(path)?);
    let file = SlimeFile::read(&mut reader)?;

    let stored = file.header.chunk_count();
    if stored != expected_chunks {
        return Err(QuarryError::ValidationError(format!(
            "{} holds {} chunks, expected {}",
            path.display(),
            stored,
            expected_chunks
        )));
    }
    log(
        format!(
            "Verified {}: {}x{} chunks at {},{}, {} bytes of chunk data",
            path.display(),
            file.header.width,
            file.header.depth,
            file.header.min_x,
            file.header.min_z,
            file.chunks.len()
        ),
        Info,
    );
    Ok(file.header)
}
