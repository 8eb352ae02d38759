//! Plain-text result artifacts
//!
//! Analysis results are one line per file (`"<tonic>\t<mode>"` or
//! `"Silence"`). Classifier predictions are appended as `"<label>, "` tokens
//! to `<filename>.key` files, so repeated runs accumulate.

use crate::error::{EdmkeyError, Result};
use crate::types::KeyOutcome;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of the classifier prediction files
pub const PREDICTION_EXTENSION: &str = "key";

/// Write (or overwrite) the result line of one recording
pub fn write_result(outcome: &KeyOutcome, path: &Path) -> Result<()> {
    let mut file = File::create(path).map_err(|e| EdmkeyError::output_error(path, e))?;
    writeln!(file, "{}", outcome).map_err(|e| EdmkeyError::output_error(path, e))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// `<dir>/<filename>.key`
pub fn prediction_path(dir: &Path, filename: &str) -> PathBuf {
    dir.join(format!("{}.{}", filename, PREDICTION_EXTENSION))
}

/// Append one `"<label>, "` token to the prediction file of `filename`
///
/// The file is created when missing; existing content is never truncated.
pub fn append_prediction(dir: &Path, filename: &str, label: &str) -> Result<PathBuf> {
    let path = prediction_path(dir, filename);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| EdmkeyError::output_error(&path, e))?;
    write!(file, "{}, ", label).map_err(|e| EdmkeyError::output_error(&path, e))?;
    Ok(path)
}
