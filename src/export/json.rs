//! JSON batch summary for interoperability with other tools

use crate::error::{EdmkeyError, Result};
use crate::types::{AnalyzedRecording, KeyOutcome};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// JSON output schema version
const SCHEMA_VERSION: &str = "1.0";

/// File name of the summary inside the output directory
pub const SUMMARY_FILE_NAME: &str = "edmkey.json";

/// Top-level JSON output structure
#[derive(Debug, Serialize, Deserialize)]
pub struct EdmkeyJson {
    /// Schema version for forward compatibility
    pub version: String,
    /// Analysis metadata
    pub metadata: ExportMetadata,
    /// Analysed recordings, in input order
    pub tracks: Vec<TrackJson>,
}

/// Export metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// edmkey version that generated this file
    pub generator_version: String,
    /// Timestamp of export
    pub exported_at: String,
    /// Key profile family used for matching
    pub profile: String,
    /// Number of tracks
    pub track_count: usize,
}

/// JSON representation of an analysed recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackJson {
    pub path: String,
    /// The result line as written to the text artifact (tab replaced by a space)
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tonic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_strength: Option<f32>,
    pub duration_seconds: f64,
}

/// Write the batch summary
///
/// Uses atomic write pattern: writes to a temp file first, then renames.
pub fn write_json(recordings: &[AnalyzedRecording], profile: &str, output_path: &Path) -> Result<()> {
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| EdmkeyError::OutputError {
        path: output_path.to_path_buf(),
        reason: format!("Failed to create temp file: {}", e),
    })?;

    let writer = BufWriter::new(file);

    let output = EdmkeyJson {
        version: SCHEMA_VERSION.to_string(),
        metadata: ExportMetadata {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            profile: profile.to_string(),
            track_count: recordings.len(),
        },
        tracks: recordings.iter().map(track_to_json).collect(),
    };

    serde_json::to_writer_pretty(writer, &output).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        EdmkeyError::OutputError {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        EdmkeyError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!("Wrote {} tracks to {}", recordings.len(), output_path.display());

    Ok(())
}

fn track_to_json(recording: &AnalyzedRecording) -> TrackJson {
    let estimate = recording.outcome.estimate();

    TrackJson {
        path: recording.path.to_string_lossy().to_string(),
        result: match &recording.outcome {
            KeyOutcome::Key(e) => format!("{} {}", e.tonic, e.mode),
            KeyOutcome::Silence => "Silence".to_string(),
        },
        tonic: estimate.map(|e| e.tonic.to_string()),
        mode: estimate.map(|e| e.mode.to_string()),
        strength: estimate.map(|e| e.strength),
        relative_strength: estimate.map(|e| e.relative_strength),
        duration_seconds: recording.duration_seconds,
    }
}
