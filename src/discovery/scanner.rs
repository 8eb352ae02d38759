//! File discovery and scanning

use crate::error::{EdmkeyError, Result};
use crate::types::AudioFormat;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extension of the per-file result artifacts
pub const RESULT_EXTENSION: &str = "txt";

/// Discovered audio file with basic metadata
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub format: AudioFormat,
    pub size_bytes: u64,
}

impl DiscoveredFile {
    /// Result artifact path for this file inside `output_dir`
    pub fn result_path(&self, output_dir: &Path) -> PathBuf {
        result_path(&self.path, output_dir)
    }
}

/// Scan the direct entries of a directory for recognized audio files
///
/// Subdirectories are not descended into. Entries are returned sorted by
/// path so batch output is reproducible.
pub fn scan(input: &Path) -> Result<Vec<DiscoveredFile>> {
    if !input.exists() {
        return Err(EdmkeyError::FileNotFound(input.to_path_buf()));
    }
    if !input.is_dir() {
        return Err(EdmkeyError::NotADirectory(input.to_path_buf()));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(input)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() {
            if let Some(file) = try_discover_file(path) {
                debug!(
                    "Discovered: {} ({:?}, {} bytes)",
                    file.path.display(),
                    file.format,
                    file.size_bytes
                );
                files.push(file);
            }
        }
    }

    info!("Discovered {} audio files", files.len());

    if files.is_empty() {
        warn!("No recognized audio files found in {}", input.display());
    }

    Ok(files)
}

/// Try to create a DiscoveredFile if the name carries a recognized type token
fn try_discover_file(path: &Path) -> Option<DiscoveredFile> {
    let name = path.file_name()?.to_str()?;
    let format = AudioFormat::from_file_name(name)?;

    let metadata = std::fs::metadata(path).ok()?;
    let size_bytes = metadata.len();

    Some(DiscoveredFile {
        path: path.to_path_buf(),
        format,
        size_bytes,
    })
}

/// Split scanned files into those that own their result path and those
/// whose result path was already claimed by an earlier file
///
/// Scan order is sorted, so `track.flac` keeps `track.txt` over `track.wav`.
pub fn split_result_collisions(
    files: Vec<DiscoveredFile>,
    output_dir: &Path,
) -> (Vec<DiscoveredFile>, Vec<DiscoveredFile>) {
    let mut claimed = HashSet::new();
    files
        .into_iter()
        .partition(|file| claimed.insert(file.result_path(output_dir)))
}

/// `<output_dir>/<stem>.txt` for an input recording
pub fn result_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string());
    output_dir.join(format!("{}.{}", stem, RESULT_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.wav", "a.mp3", "notes.txt", "c.FLAC", "mix.wav.bak"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.wav")).unwrap();
        fs::write(dir.path().join("nested.wav").join("deep.wav"), b"x").unwrap();

        let files = scan(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp3", "b.wav", "c.FLAC", "mix.wav.bak"]);
        assert_eq!(files[0].format, AudioFormat::Mp3);
        assert_eq!(files[0].size_bytes, 1);
    }

    #[test]
    fn test_scan_missing_directory() {
        let result = scan(Path::new("/nonexistent/music"));
        assert!(matches!(result, Err(EdmkeyError::FileNotFound(_))));
    }

    #[test]
    fn test_scan_rejects_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("track.wav");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(scan(&file), Err(EdmkeyError::NotADirectory(_))));
    }

    #[test]
    fn test_result_path() {
        let out = Path::new("/out");
        assert_eq!(
            result_path(Path::new("/music/track one.flac"), out),
            PathBuf::from("/out/track one.txt")
        );
        assert_eq!(
            result_path(Path::new("/music/a.b.wav"), out),
            PathBuf::from("/out/a.b.txt")
        );
    }

    #[test]
    fn test_same_stem_keeps_first_sorted_file() {
        let dir = TempDir::new().unwrap();
        for name in ["track.wav", "track.flac", "other.mp3"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = scan(dir.path()).unwrap();
        let (owners, shadowed) = split_result_collisions(files, Path::new("/out"));

        let owner_names: Vec<_> = owners.iter().map(|f| f.path.file_name().unwrap()).collect();
        assert_eq!(owner_names, ["other.mp3", "track.flac"]);
        assert_eq!(shadowed.len(), 1);
        assert_eq!(shadowed[0].path.file_name().unwrap(), "track.wav");
    }
}
