use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{error, info};

use crate::assembler::{prepare_dataset, PrepareOptions};
use crate::checksum::matches_previous;
use crate::raster::RasterMaskReader;
use crate::scene::SceneSource;
use crate::valid_region::ValidRegionService;
use crate::writer::{output_path, DescriptorWriter};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    /// Scenes created on or before this date are skipped.
    pub since: Option<NaiveDate>,
    /// Re-prepare existing outputs whose stored checksum differs.
    pub checksum: bool,
    pub prepare: PrepareOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneOutcome {
    Written(PathBuf),
    SkippedOld,
    SkippedExisting(PathBuf),
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: usize,
    pub skipped: usize,
    pub failures: Vec<(PathBuf, String)>,
}

/// Every entry of every input folder is a scene candidate, sorted per folder.
pub fn collect_scenes(input_dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut scenes = Vec::new();
    for dir in input_dirs {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read input folder {}", dir.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()
            .with_context(|| format!("Failed to list {}", dir.display()))?;
        entries.sort();
        scenes.extend(entries);
    }
    Ok(scenes)
}

fn creation_time(path: &Path) -> Result<DateTime<Utc>> {
    let metadata =
        fs::metadata(path).with_context(|| format!("Failed to stat {}", path.display()))?;
    let time: SystemTime = metadata
        .created()
        .or_else(|_| metadata.modified())
        .with_context(|| format!("No timestamp for {}", path.display()))?;
    Ok(DateTime::<Utc>::from(time))
}

/// `since` is taken as midnight UTC.
fn is_older_than(created: DateTime<Utc>, since: NaiveDate) -> bool {
    created.naive_utc() <= since.and_time(NaiveTime::MIN)
}

/// Prepares one scene unless it is too old or already prepared.
pub fn process_scene<R: RasterMaskReader>(
    scene_path: &Path,
    service: &ValidRegionService<R>,
    options: &BatchOptions,
) -> Result<SceneOutcome> {
    if let Some(since) = options.since {
        let created = creation_time(scene_path)?;
        if is_older_than(created, since) {
            info!(
                "Scene {} created {} is not after {}, skipping",
                scene_path.display(),
                created,
                since
            );
            return Ok(SceneOutcome::SkippedOld);
        }
    }

    let source = SceneSource::classify(scene_path)?;
    let metadata = source.find_metadata(&options.output_dir)?;
    let xml_path = metadata.path();
    info!("Processing {}", xml_path.display());

    let output = output_path(&options.output_dir, xml_path);
    if output.exists() {
        if !options.checksum {
            info!("Output already exists {}, skipping", output.display());
            return Ok(SceneOutcome::SkippedExisting(output));
        }
        info!("Running checksum comparison against {}", output.display());
        if matches_previous(&output, xml_path)? {
            info!("Checksum unchanged for {}, skipping", output.display());
            return Ok(SceneOutcome::SkippedExisting(output));
        }
    }

    let descriptor = prepare_dataset(xml_path, &source, service, &options.prepare)
        .with_context(|| format!("Failed to prepare {}", scene_path.display()))?;
    DescriptorWriter::new().write(&descriptor, &output)?;
    Ok(SceneOutcome::Written(output))
}

/// Processes scenes in parallel on the current rayon pool. Failures are
/// logged and collected; they never stop other scenes.
pub fn process_all<R: RasterMaskReader + Sync>(
    scenes: &[PathBuf],
    service: &ValidRegionService<R>,
    options: &BatchOptions,
) -> BatchReport {
    let results: Vec<Result<SceneOutcome>> = scenes
        .par_iter()
        .map(|scene| process_scene(scene, service, options))
        .collect();

    let mut report = BatchReport::default();
    for (scene, result) in scenes.iter().zip(results) {
        match result {
            Ok(SceneOutcome::Written(_)) => report.written += 1,
            Ok(_) => report.skipped += 1,
            Err(e) => {
                error!("{}: {:#}", scene.display(), e);
                report.failures.push((scene.clone(), format!("{:#}", e)));
            }
        }
    }
    report
}
