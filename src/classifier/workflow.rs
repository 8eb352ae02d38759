//! Train-then-predict workflow
//!
//! Fits a [`MarginClassifier`] on a labeled feature table, predicts a label
//! for every row of a second table, and appends each prediction to the
//! `<filename>.key` file of that row.

use crate::classifier::dataset::{FeatureTable, TrainingDataset};
use crate::classifier::model::MarginClassifier;
use crate::config::ClassifySettings;
use crate::error::{EdmkeyError, Result};
use crate::export;
use std::path::{Path, PathBuf};
use tracing::info;

/// What a classification run did
#[derive(Debug)]
pub struct ClassificationSummary {
    pub training_rows: usize,
    pub predicted_rows: usize,
    /// Labels seen during training, sorted
    pub labels: Vec<String>,
    /// Directory holding the `.key` files
    pub output_dir: PathBuf,
}

/// Run the whole workflow
pub fn run(settings: &ClassifySettings) -> Result<ClassificationSummary> {
    let training = TrainingDataset::load(&settings.training, &settings.layout)?;
    info!("{} files used for training", training.len());

    let mut classifier = MarginClassifier::new(settings.classifier.clone());
    classifier.fit(training.features.view(), &training.labels)?;

    let table = FeatureTable::load(&settings.analysis, &settings.layout)?;
    if table.dim() != training.dim() {
        return Err(EdmkeyError::DimensionMismatch {
            expected: training.dim(),
            found: table.dim(),
        });
    }

    let output_dir = match &settings.output_dir {
        Some(dir) => dir.clone(),
        None => default_output_dir(&settings.analysis),
    };
    if !output_dir.is_dir() {
        return Err(EdmkeyError::NotADirectory(output_dir));
    }

    // All rows are predicted before any file is touched
    let predictions = classifier.predict_batch(table.features.view())?;

    // Sequential so repeated filenames append in row order
    for (filename, label) in table.filenames.iter().zip(&predictions) {
        export::append_prediction(&output_dir, filename, label)?;
    }

    info!(
        "Appended {} predictions to .key files in {}",
        predictions.len(),
        output_dir.display()
    );

    Ok(ClassificationSummary {
        training_rows: training.len(),
        predicted_rows: predictions.len(),
        labels: classifier.labels().to_vec(),
        output_dir,
    })
}

/// Directory of the analysis table
fn default_output_dir(analysis: &Path) -> PathBuf {
    match analysis.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            default_output_dir(Path::new("/data/run/merged_results.csv")),
            PathBuf::from("/data/run")
        );
        assert_eq!(default_output_dir(Path::new("merged.csv")), PathBuf::from("."));
    }
}
