//! Integration tests for the classifier workflow
//!
//! Feature tables are written as CSV files into temp directories and the
//! workflow is run end to end, checking the `.key` files it appends to.

use edmkey::classifier::{self, ClassifierConfig, ColumnRef, DatasetLayout, Kernel};
use edmkey::config::ClassifySettings;
use edmkey::EdmkeyError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TRAINING: &str = "\
file,duration,profile,scope,f0,f1,f2,f3,key
a1.wav,10,edma,average,1.0,0.1,0.0,0.2,A minor
a2.wav,11,edma,average,0.9,0.0,0.1,0.1,A minor
a3.wav,12,edma,average,1.1,0.2,0.0,0.0,A minor
c1.wav,10,edma,average,0.0,1.0,0.1,0.1,C major
c2.wav,9,edma,average,0.1,0.9,0.0,0.2,C major
c3.wav,8,edma,average,0.0,1.1,0.2,0.0,C major
f1.wav,7,edma,average,0.1,0.0,1.0,0.1,F major
f2.wav,7,edma,average,0.0,0.2,0.9,0.0,F major
";

const ANALYSIS: &str = "\
file,duration,profile,scope,f0,f1,f2,f3
first.wav,10,edma,average,1.0,0.0,0.1,0.1
second.wav,10,edma,average,0.1,1.0,0.0,0.1
first.wav,10,edma,average,0.0,0.1,1.0,0.0
";

fn layout() -> DatasetLayout {
    DatasetLayout {
        filename_column: ColumnRef::Index(0),
        label_column: ColumnRef::Name("key".to_string()),
        feature_columns: 4..8,
        has_headers: true,
    }
}

fn write_tables(dir: &Path, analysis: &str) -> (PathBuf, PathBuf) {
    let training = dir.join("training.csv");
    let analysis_path = dir.join("merged_results.csv");
    fs::write(&training, TRAINING).unwrap();
    fs::write(&analysis_path, analysis).unwrap();
    (training, analysis_path)
}

fn settings(training: PathBuf, analysis: PathBuf, kernel: Kernel) -> ClassifySettings {
    ClassifySettings {
        training,
        analysis,
        output_dir: None,
        layout: layout(),
        classifier: ClassifierConfig {
            kernel,
            ..ClassifierConfig::default()
        },
    }
}

#[test]
fn test_predictions_are_appended_next_to_analysis_table() {
    let dir = TempDir::new().unwrap();
    let (training, analysis) = write_tables(dir.path(), ANALYSIS);

    let summary = classifier::run(&settings(training, analysis, Kernel::Linear)).unwrap();

    assert_eq!(summary.training_rows, 8);
    assert_eq!(summary.predicted_rows, 3);
    assert_eq!(summary.labels, vec!["A minor", "C major", "F major"]);
    assert_eq!(summary.output_dir, dir.path());

    // repeated filenames append in row order
    assert_eq!(
        fs::read_to_string(dir.path().join("first.wav.key")).unwrap(),
        "A minor, F major, "
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("second.wav.key")).unwrap(),
        "C major, "
    );
}

#[test]
fn test_rerun_accumulates_tokens() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let (training, analysis) = write_tables(dir.path(), "file,duration,profile,scope,f0,f1,f2,f3\nx.wav,1,edma,average,0.0,1.0,0.0,0.0\n");

    let mut settings = settings(training, analysis, Kernel::Rbf { gamma: None });
    settings.output_dir = Some(out.path().to_path_buf());

    classifier::run(&settings).unwrap();
    classifier::run(&settings).unwrap();

    assert_eq!(
        fs::read_to_string(out.path().join("x.wav.key")).unwrap(),
        "C major, C major, "
    );
    assert!(!dir.path().join("x.wav.key").exists());
}

#[test]
fn test_bad_feature_value_aborts_before_writing() {
    let dir = TempDir::new().unwrap();
    let (training, analysis) = write_tables(
        dir.path(),
        "file,duration,profile,scope,f0,f1,f2,f3\nx.wav,1,edma,average,0.0,n/a,0.0,0.0\n",
    );

    let err = classifier::run(&settings(training, analysis, Kernel::Linear)).unwrap_err();
    assert!(matches!(err, EdmkeyError::DatasetError { .. }));
    assert!(!dir.path().join("x.wav.key").exists());
}

#[test]
fn test_missing_training_table() {
    let dir = TempDir::new().unwrap();
    let analysis = dir.path().join("merged_results.csv");
    fs::write(&analysis, ANALYSIS).unwrap();

    let err = classifier::run(&settings(
        dir.path().join("missing.csv"),
        analysis,
        Kernel::Linear,
    ))
    .unwrap_err();
    assert!(matches!(err, EdmkeyError::FileNotFound(_)));
}

#[test]
fn test_missing_output_dir() {
    let dir = TempDir::new().unwrap();
    let (training, analysis) = write_tables(dir.path(), ANALYSIS);

    let mut settings = settings(training, analysis, Kernel::Linear);
    settings.output_dir = Some(dir.path().join("nope"));

    let err = classifier::run(&settings).unwrap_err();
    assert!(matches!(err, EdmkeyError::NotADirectory(_)));
}
