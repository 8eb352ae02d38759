//! Feature tables for the classifier
//!
//! Tables are CSV files with one row per analysed recording: a filename
//! column, a contiguous run of numeric feature columns (chroma values and
//! derived features), and, for training tables, a label column.

use crate::error::{EdmkeyError, Result};
use csv::{ReaderBuilder, StringRecord};
use ndarray::Array2;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

/// A column addressed by position or by header name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl ColumnRef {
    /// Numeric strings are positions, anything else is a header name
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        match value.parse::<usize>() {
            Ok(index) => ColumnRef::Index(index),
            Err(_) => ColumnRef::Name(value.to_string()),
        }
    }

    fn resolve(&self, headers: Option<&StringRecord>, path: &Path) -> Result<usize> {
        match self {
            ColumnRef::Index(index) => Ok(*index),
            ColumnRef::Name(name) => {
                let headers = headers.ok_or_else(|| {
                    EdmkeyError::dataset_error(
                        path,
                        format!("column '{}' is addressed by name but the table has no header", name),
                    )
                })?;
                headers
                    .iter()
                    .position(|h| h.trim() == name)
                    .ok_or_else(|| {
                        EdmkeyError::dataset_error(path, format!("no column named '{}'", name))
                    })
            }
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(index) => write!(f, "#{}", index),
            ColumnRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// Where things live in a feature table
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetLayout {
    pub filename_column: ColumnRef,
    pub label_column: ColumnRef,
    /// Half-open range of feature column positions
    pub feature_columns: Range<usize>,
    pub has_headers: bool,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self {
            filename_column: ColumnRef::Index(0),
            label_column: ColumnRef::Index(78),
            feature_columns: 4..76,
            has_headers: true,
        }
    }
}

impl DatasetLayout {
    pub fn feature_count(&self) -> usize {
        self.feature_columns.len()
    }
}

/// Labeled feature table used for training
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    pub filenames: Vec<String>,
    /// One row per recording
    pub features: Array2<f64>,
    pub labels: Vec<String>,
}

impl TrainingDataset {
    pub fn load(path: &Path, layout: &DatasetLayout) -> Result<Self> {
        let table = read_table(path, layout, true)?;
        Ok(Self {
            filenames: table.filenames,
            features: table.features,
            labels: table.labels,
        })
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.features.ncols()
    }
}

/// Unlabeled feature table to predict
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub filenames: Vec<String>,
    pub features: Array2<f64>,
}

impl FeatureTable {
    pub fn load(path: &Path, layout: &DatasetLayout) -> Result<Self> {
        let table = read_table(path, layout, false)?;
        Ok(Self {
            filenames: table.filenames,
            features: table.features,
        })
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.features.ncols()
    }
}

struct RawTable {
    filenames: Vec<String>,
    features: Array2<f64>,
    labels: Vec<String>,
}

fn read_table(path: &Path, layout: &DatasetLayout, with_labels: bool) -> Result<RawTable> {
    if !path.exists() {
        return Err(EdmkeyError::FileNotFound(path.to_path_buf()));
    }
    if layout.feature_columns.is_empty() {
        return Err(EdmkeyError::dataset_error(path, "feature column range is empty"));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(layout.has_headers)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| EdmkeyError::dataset_error(path, e.to_string()))?;

    let headers = if layout.has_headers {
        Some(
            reader
                .headers()
                .map_err(|e| EdmkeyError::dataset_error(path, e.to_string()))?
                .clone(),
        )
    } else {
        None
    };

    let filename_index = layout.filename_column.resolve(headers.as_ref(), path)?;
    let label_index = if with_labels {
        Some(layout.label_column.resolve(headers.as_ref(), path)?)
    } else {
        None
    };

    let dim = layout.feature_count();
    let mut filenames = Vec::new();
    let mut labels = Vec::new();
    let mut values = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| EdmkeyError::dataset_error(path, e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let field = |index: usize| {
            record.get(index).ok_or_else(|| {
                EdmkeyError::dataset_error(
                    path,
                    format!("line {}: has {} columns, needs column {}", line, record.len(), index),
                )
            })
        };

        filenames.push(field(filename_index)?.to_string());
        if let Some(index) = label_index {
            labels.push(field(index)?.to_string());
        }
        for column in layout.feature_columns.clone() {
            let raw = field(column)?;
            let value: f64 = raw.parse().map_err(|_| {
                EdmkeyError::dataset_error(
                    path,
                    format!("line {}, column {}: '{}' is not a number", line, column, raw),
                )
            })?;
            values.push(value);
        }
    }

    if filenames.is_empty() {
        return Err(EdmkeyError::dataset_error(path, "table has no data rows"));
    }

    let rows = filenames.len();
    let features = Array2::from_shape_vec((rows, dim), values)
        .map_err(|e| EdmkeyError::dataset_error(path, e.to_string()))?;

    debug!("Loaded {} rows x {} features from {}", rows, dim, path.display());

    Ok(RawTable {
        filenames,
        features,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn layout() -> DatasetLayout {
        DatasetLayout {
            filename_column: ColumnRef::Index(0),
            label_column: ColumnRef::Name("key".to_string()),
            feature_columns: 1..4,
            has_headers: true,
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_column_ref_parse() {
        assert_eq!(ColumnRef::parse("78"), ColumnRef::Index(78));
        assert_eq!(ColumnRef::parse(" key "), ColumnRef::Name("key".to_string()));
    }

    #[test]
    fn test_load_training_table() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "train.csv",
            "file,a,b,c,key\none.wav,0.1,0.2,0.3,C major\ntwo.wav, 1, 2, 3 ,A minor\n",
        );

        let dataset = TrainingDataset::load(&path, &layout()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 3);
        assert_eq!(dataset.filenames, vec!["one.wav", "two.wav"]);
        assert_eq!(dataset.labels, vec!["C major", "A minor"]);
        assert_eq!(dataset.features[[1, 2]], 3.0);
    }

    #[test]
    fn test_unlabeled_table_needs_no_label_column() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "an.csv", "file,a,b,c\nx.wav,1,2,3\n");
        let table = FeatureTable::load(&path, &layout()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.features[[0, 0]], 1.0);
    }

    #[test]
    fn test_headerless_positions() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "raw.csv", "x.wav,1,2,3,G major\n");
        let layout = DatasetLayout {
            label_column: ColumnRef::Index(4),
            has_headers: false,
            ..layout()
        };
        let dataset = TrainingDataset::load(&path, &layout).unwrap();
        assert_eq!(dataset.labels, vec!["G major"]);
    }

    #[test]
    fn test_non_numeric_feature() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.csv", "file,a,b,c,key\none.wav,0.1,oops,0.3,C major\n");
        let err = TrainingDataset::load(&path, &layout()).unwrap_err();
        match err {
            EdmkeyError::DatasetError { reason, .. } => assert!(reason.contains("oops")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_column_name() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.csv", "file,a,b,c,tonality\none.wav,1,2,3,C major\n");
        assert!(matches!(
            TrainingDataset::load(&path, &layout()),
            Err(EdmkeyError::DatasetError { .. })
        ));
    }

    #[test]
    fn test_short_row() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "short.csv", "x.wav,1\n");
        let layout = DatasetLayout {
            has_headers: false,
            ..layout()
        };
        assert!(matches!(
            FeatureTable::load(&path, &layout),
            Err(EdmkeyError::DatasetError { .. })
        ));
    }

    #[test]
    fn test_empty_table_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.csv", "file,a,b,c,key\n");
        assert!(matches!(
            TrainingDataset::load(&path, &layout()),
            Err(EdmkeyError::DatasetError { .. })
        ));
        assert!(matches!(
            TrainingDataset::load(&dir.path().join("nope.csv"), &layout()),
            Err(EdmkeyError::FileNotFound(_))
        ));
    }
}
