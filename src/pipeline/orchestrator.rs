//! Pipeline orchestration
//!
//! Coordinates profile loading, file discovery, parallel analysis, and
//! export. Single-file mode analyses one recording into one result file;
//! batch mode analyses every recognized file of a directory.

use crate::analysis::{ChromaKeyDetector, KeyDetector, ProfileRegistry};
use crate::audio;
use crate::config::Settings;
use crate::discovery::{self, DiscoveredFile};
use crate::error::{EdmkeyError, ErrorContext, Result};
use crate::export;
use crate::types::AnalyzedRecording;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Pipeline result summary
#[derive(Debug)]
pub struct PipelineResult {
    /// Recognized input files
    pub total_files: usize,
    /// Files whose result artifact was written
    pub processed: usize,
    pub failed: usize,
    /// Files skipped because they could not be decoded or analysed
    pub skipped: usize,
    /// Analysed recordings, in input order
    pub recordings: Vec<AnalyzedRecording>,
}

/// Run the key estimation pipeline
pub fn run(settings: &Settings) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();

    let registry = match &settings.profiles_file {
        Some(path) => ProfileRegistry::from_path(path)?,
        None => ProfileRegistry::builtin()?,
    };
    let detector = ChromaKeyDetector::new(&settings.analysis, &registry)?;

    if settings.verbose {
        println!("key profile used: {}", detector.profile_name());
    }

    let result = if settings.batch_mode {
        run_batch(settings, &detector)?
    } else {
        run_single(settings, &detector)?
    };

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(result)
}

/// Analyse one file into the output path
fn run_single(settings: &Settings, detector: &ChromaKeyDetector) -> Result<PipelineResult> {
    if !settings.input.is_file() {
        return Err(EdmkeyError::FileNotFound(settings.input.clone()));
    }

    info!("Analysing: {}", settings.input.display());
    info!("Exporting to: {}", settings.output.display());

    let recording = analyze_single_file(&settings.input, &settings.output, detector)?;

    if settings.verbose {
        println!("{} - {}", settings.input.display(), recording.outcome);
    }

    Ok(PipelineResult {
        total_files: 1,
        processed: 1,
        failed: 0,
        skipped: 0,
        recordings: vec![recording],
    })
}

/// Analyse every recognized file of the input directory
fn run_batch(settings: &Settings, detector: &ChromaKeyDetector) -> Result<PipelineResult> {
    let discovery_start = Instant::now();
    info!("Scanning {} for audio files...", settings.input.display());
    let scanned = discovery::scan(&settings.input)?;
    let total_bytes: u64 = scanned.iter().map(|f| f.size_bytes).sum();
    info!(
        "Found {} audio files ({:.1} MB) in {:.2}s",
        scanned.len(),
        total_bytes as f64 / (1024.0 * 1024.0),
        discovery_start.elapsed().as_secs_f64()
    );
    let total_files = scanned.len();

    // No file is analysed until the output directory is usable
    prepare_output_dir(&settings.output)?;
    configure_thread_pool(settings.analysis_threads)?;

    let (files, shadowed) = discovery::split_result_collisions(scanned, &settings.output);
    for file in &shadowed {
        warn!(
            "Skipping {}: its result file {} belongs to an earlier file",
            file.path.display(),
            file.result_path(&settings.output).display()
        );
    }

    if files.is_empty() {
        return Ok(PipelineResult {
            total_files: 0,
            processed: 0,
            failed: 0,
            skipped: 0,
            recordings: Vec::new(),
        });
    }

    info!("Writing estimation files to {}", settings.output.display());

    let analysis_start = Instant::now();
    let (recordings, stats) = analyze_files(&files, settings, detector);
    let elapsed = analysis_start.elapsed().as_secs_f64();
    let tracks_per_sec = if elapsed > 0.0 {
        files.len() as f64 / elapsed
    } else {
        0.0
    };
    info!(
        "{} audio files analysed in {:.2}s ({:.1} tracks/sec)",
        stats.processed, elapsed, tracks_per_sec
    );

    if settings.output_json && !recordings.is_empty() {
        let json_path = settings.output.join(export::SUMMARY_FILE_NAME);
        export::write_json(&recordings, detector.profile_name(), &json_path)?;
    }

    Ok(PipelineResult {
        total_files,
        processed: stats.processed,
        failed: stats.failed,
        skipped: stats.skipped + shadowed.len(),
        recordings,
    })
}

/// Make sure the batch output directory exists
///
/// An existing regular file is rejected. A missing directory is only
/// created from an absolute path.
pub fn prepare_output_dir(output: &Path) -> Result<()> {
    if output.is_file() {
        return Err(EdmkeyError::OutputIsFile(output.to_path_buf()));
    }
    if output.is_dir() {
        return Ok(());
    }
    if !output.is_absolute() {
        return Err(EdmkeyError::InvalidOutputPath(output.to_path_buf()));
    }

    info!("Creating directory {}", output.display());
    std::fs::create_dir_all(output).map_err(|e| EdmkeyError::output_error(output, e))
}

/// Configure the Rayon thread pool
fn configure_thread_pool(num_threads: usize) -> Result<()> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(()) => {
            debug!("Configured thread pool with {} threads", num_threads);
        }
        Err(e) => {
            // If the pool is already initialized (e.g., in tests), that's OK
            if e.to_string().contains("already been initialized") {
                debug!("Thread pool already initialized, using existing pool");
            } else {
                return Err(EdmkeyError::ConfigError(format!(
                    "Failed to configure thread pool: {}",
                    e
                )));
            }
        }
    }
    Ok(())
}

/// Analysis statistics
struct AnalysisStats {
    processed: usize,
    failed: usize,
    skipped: usize,
}

/// Analyze files in parallel, one result artifact per file
fn analyze_files(
    files: &[DiscoveredFile],
    settings: &Settings,
    detector: &ChromaKeyDetector,
) -> (Vec<AnalyzedRecording>, AnalysisStats) {
    let progress_bar = if settings.show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let processed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);

    // Each worker writes only its own artifact; collect() keeps input order
    let recordings: Vec<AnalyzedRecording> = files
        .par_iter()
        .filter_map(|file| {
            let result_path = file.result_path(&settings.output);
            let result = analyze_single_file(&file.path, &result_path, detector);

            if let Some(ref pb) = progress_bar {
                pb.inc(1);
                pb.set_message(format!(
                    "{}",
                    file.path.file_name().unwrap_or_default().to_string_lossy()
                ));
            }

            match result {
                Ok(recording) => {
                    processed.fetch_add(1, Ordering::Relaxed);
                    if settings.verbose {
                        println!("{} - {}", file.path.display(), recording.outcome);
                    }
                    Some(recording)
                }
                Err(e) => {
                    if e.is_recoverable() {
                        warn!("Skipping {}: {}", file.path.display(), e);
                        skipped.fetch_add(1, Ordering::Relaxed);
                    } else {
                        error!("Failed {}: {}", file.path.display(), e);
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                    None
                }
            }
        })
        .collect();

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Analysis complete");
    }

    let stats = AnalysisStats {
        processed: processed.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        skipped: skipped.load(Ordering::Relaxed),
    };

    (recordings, stats)
}

/// Decode, analyse, and write the result of one file
fn analyze_single_file(
    input: &Path,
    result_path: &Path,
    detector: &ChromaKeyDetector,
) -> Result<AnalyzedRecording> {
    debug!("Analyzing: {}", input.display());

    let buffer = audio::decode(input, detector.config().sample_rate)?;
    let outcome = detector.detect(&buffer).with_file_context(input)?;

    export::write_result(&outcome, result_path)?;

    debug!(
        "Analyzed {}: {}",
        input.file_name().unwrap_or_default().to_string_lossy(),
        outcome
    );

    Ok(AnalyzedRecording {
        path: input.to_path_buf(),
        result_path: result_path.to_path_buf(),
        outcome,
        duration_seconds: buffer.duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_existing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(prepare_output_dir(dir.path()).is_ok());
    }

    #[test]
    fn test_prepare_rejects_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("out");
        fs::write(&file, b"").unwrap();
        assert!(matches!(
            prepare_output_dir(&file),
            Err(EdmkeyError::OutputIsFile(_))
        ));
    }

    #[test]
    fn test_prepare_rejects_relative_missing_dir() {
        let result = prepare_output_dir(Path::new("relative/edmkey-missing-output"));
        assert!(matches!(result, Err(EdmkeyError::InvalidOutputPath(_))));
    }

    #[test]
    fn test_prepare_creates_absolute_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("results").join("keys");
        prepare_output_dir(&out).unwrap();
        assert!(out.is_dir());
    }
}
