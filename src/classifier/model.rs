//! Margin classifier over chroma feature vectors
//!
//! A multi-class perceptron with a margin requirement, trained either on
//! the raw features (linear kernel, with a bias weight) or in dual form on
//! an RBF Gram matrix. Training is deterministic: rows are visited in
//! order and labels are indexed in sorted order.

use crate::error::{EdmkeyError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Kernel used to compare feature vectors
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    Linear,
    /// `exp(-gamma * |a - b|^2)`; `None` picks `1 / (dim * var(X))`
    Rbf { gamma: Option<f64> },
}

/// Training parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub kernel: Kernel,
    /// Upper bound on passes over the training rows
    pub max_epochs: usize,
    /// Required score gap between the true label and the best rival
    pub margin: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kernel: Kernel::Rbf { gamma: None },
            max_epochs: 1000,
            margin: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
enum Model {
    /// One weight row per label; the last column is the bias
    Linear { weights: Array2<f64> },
    /// Dual coefficients per label over the retained training rows
    Rbf {
        support: Array2<f64>,
        alphas: Array2<f64>,
        gamma: f64,
    },
}

#[derive(Debug, Clone)]
enum State {
    Untrained,
    Trained {
        labels: Vec<String>,
        dim: usize,
        model: Model,
    },
}

/// Supervised key label classifier
#[derive(Debug, Clone)]
pub struct MarginClassifier {
    config: ClassifierConfig,
    state: State,
}

impl MarginClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            state: State::Untrained,
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, State::Trained { .. })
    }

    /// Known labels in sorted order (empty before training)
    pub fn labels(&self) -> &[String] {
        match &self.state {
            State::Trained { labels, .. } => labels,
            State::Untrained => &[],
        }
    }

    /// Feature dimension of the trained model
    pub fn dim(&self) -> Option<usize> {
        match &self.state {
            State::Trained { dim, .. } => Some(*dim),
            State::Untrained => None,
        }
    }

    /// Fit on one feature row per label; replaces any previous model
    pub fn fit(&mut self, features: ArrayView2<f64>, labels: &[String]) -> Result<()> {
        let (rows, dim) = features.dim();
        if rows == 0 || dim == 0 {
            return Err(EdmkeyError::dataset_error(
                PathBuf::new(),
                "cannot train on an empty feature table",
            ));
        }
        if labels.len() != rows {
            return Err(EdmkeyError::DimensionMismatch {
                expected: rows,
                found: labels.len(),
            });
        }

        let classes: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let targets: Vec<usize> = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or(0))
            .collect();

        info!(
            "Training on {} rows, {} features, {} labels",
            rows,
            dim,
            classes.len()
        );

        let model = match self.config.kernel {
            Kernel::Linear => self.fit_linear(features, &targets, classes.len()),
            Kernel::Rbf { gamma } => {
                let gamma = gamma.unwrap_or_else(|| default_gamma(features));
                self.fit_rbf(features, &targets, classes.len(), gamma)
            }
        };

        self.state = State::Trained {
            labels: classes,
            dim,
            model,
        };
        Ok(())
    }

    fn fit_linear(&self, features: ArrayView2<f64>, targets: &[usize], classes: usize) -> Model {
        let (rows, dim) = features.dim();
        let mut weights = Array2::<f64>::zeros((classes, dim + 1));
        let augmented: Vec<Array1<f64>> = features
            .outer_iter()
            .map(|row| {
                let mut x = Array1::<f64>::ones(dim + 1);
                x.slice_mut(ndarray::s![..dim]).assign(&row);
                x
            })
            .collect();

        let mut converged = false;
        for epoch in 0..self.config.max_epochs {
            let mut updates = 0;
            for i in 0..rows {
                let scores = weights.dot(&augmented[i]);
                let truth = targets[i];
                if let Some(rival) = best_rival(scores.view(), truth) {
                    if scores[truth] - scores[rival] < self.config.margin {
                        weights.row_mut(truth).scaled_add(1.0, &augmented[i]);
                        weights.row_mut(rival).scaled_add(-1.0, &augmented[i]);
                        updates += 1;
                    }
                }
            }
            if updates == 0 {
                debug!("Linear training converged after {} epochs", epoch + 1);
                converged = true;
                break;
            }
        }
        if !converged {
            warn!(
                "Training stopped after {} epochs without separating every row",
                self.config.max_epochs
            );
        }

        Model::Linear { weights }
    }

    fn fit_rbf(
        &self,
        features: ArrayView2<f64>,
        targets: &[usize],
        classes: usize,
        gamma: f64,
    ) -> Model {
        let rows = features.nrows();
        let gram = gram_matrix(features, gamma);

        let mut alphas = Array2::<f64>::zeros((classes, rows));
        // scores[c][i] = sum_j alphas[c][j] * gram[j][i]
        let mut scores = Array2::<f64>::zeros((classes, rows));

        let mut converged = false;
        for epoch in 0..self.config.max_epochs {
            let mut updates = 0;
            for i in 0..rows {
                let truth = targets[i];
                let column = scores.column(i);
                if let Some(rival) = best_rival(column, truth) {
                    if column[truth] - column[rival] < self.config.margin {
                        alphas[[truth, i]] += 1.0;
                        alphas[[rival, i]] -= 1.0;
                        let kernel_row = gram.row(i);
                        scores.row_mut(truth).scaled_add(1.0, &kernel_row);
                        scores.row_mut(rival).scaled_add(-1.0, &kernel_row);
                        updates += 1;
                    }
                }
            }
            if updates == 0 {
                debug!("RBF training converged after {} epochs", epoch + 1);
                converged = true;
                break;
            }
        }
        if !converged {
            warn!(
                "Training stopped after {} epochs without separating every row",
                self.config.max_epochs
            );
        }

        // Only rows that were ever updated take part in predictions
        let kept: Vec<usize> = (0..rows)
            .filter(|&j| alphas.column(j).iter().any(|&a| a != 0.0))
            .collect();
        debug!("{} of {} training rows retained", kept.len(), rows);

        if kept.is_empty() {
            return Model::Rbf {
                support: Array2::zeros((0, features.ncols())),
                alphas: Array2::zeros((classes, 0)),
                gamma,
            };
        }
        Model::Rbf {
            support: features.select(Axis(0), &kept),
            alphas: alphas.select(Axis(1), &kept),
            gamma,
        }
    }

    /// Predict the label of one feature row
    pub fn predict(&self, features: ArrayView1<f64>) -> Result<&str> {
        let State::Trained { labels, dim, model } = &self.state else {
            return Err(EdmkeyError::NotTrained);
        };
        if features.len() != *dim {
            return Err(EdmkeyError::DimensionMismatch {
                expected: *dim,
                found: features.len(),
            });
        }

        let scores: Array1<f64> = match model {
            Model::Linear { weights } => {
                let bias = weights.column(*dim);
                weights.slice(ndarray::s![.., ..*dim]).dot(&features) + &bias
            }
            Model::Rbf {
                support,
                alphas,
                gamma,
            } => {
                let kernel: Array1<f64> = support
                    .outer_iter()
                    .map(|row| rbf(row, features, *gamma))
                    .collect();
                alphas.dot(&kernel)
            }
        };

        Ok(&labels[argmax(scores.view())])
    }

    /// Predict every row of a table, in parallel
    ///
    /// Fails as a whole if any row cannot be predicted.
    pub fn predict_batch(&self, features: ArrayView2<f64>) -> Result<Vec<String>> {
        if let Some(dim) = self.dim() {
            if features.ncols() != dim {
                return Err(EdmkeyError::DimensionMismatch {
                    expected: dim,
                    found: features.ncols(),
                });
            }
        }

        (0..features.nrows())
            .into_par_iter()
            .map(|i| self.predict(features.row(i)).map(str::to_string))
            .collect()
    }
}

/// Highest-scoring label other than `truth` (first one on ties)
fn best_rival(scores: ArrayView1<f64>, truth: usize) -> Option<usize> {
    let mut rival: Option<usize> = None;
    for (c, &score) in scores.iter().enumerate() {
        if c == truth {
            continue;
        }
        if rival.map_or(true, |r| score > scores[r]) {
            rival = Some(c);
        }
    }
    rival
}

/// Index of the first maximum
fn argmax(scores: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = i;
        }
    }
    best
}

/// RBF kernel plus a constant term acting as a bias
fn rbf(a: ArrayView1<f64>, b: ArrayView1<f64>, gamma: f64) -> f64 {
    let distance: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * distance).exp() + 1.0
}

fn gram_matrix(features: ArrayView2<f64>, gamma: f64) -> Array2<f64> {
    let rows = features.nrows();
    let values: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map_iter(|i| {
            let row = features.row(i);
            (0..rows).map(move |j| rbf(row, features.row(j), gamma))
        })
        .collect();
    Array2::from_shape_vec((rows, rows), values).unwrap_or_else(|_| Array2::zeros((rows, rows)))
}

/// `1 / (dim * var(X))` over all feature values, 1.0 for constant data
fn default_gamma(features: ArrayView2<f64>) -> f64 {
    let count = features.len() as f64;
    if count == 0.0 {
        return 1.0;
    }
    let mean = features.sum() / count;
    let variance = features.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count;
    let dim = features.ncols() as f64;
    if variance > 0.0 && dim > 0.0 {
        1.0 / (dim * variance)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn clusters() -> (Array2<f64>, Vec<String>) {
        let features = array![
            [1.0, 0.1, 0.0],
            [0.9, 0.0, 0.1],
            [1.1, 0.2, 0.0],
            [0.0, 1.0, 0.1],
            [0.1, 0.9, 0.0],
            [0.0, 1.2, 0.2],
            [0.1, 0.0, 1.0],
            [0.0, 0.2, 0.8],
        ];
        let labels = labels(&[
            "A minor", "A minor", "A minor", "C major", "C major", "C major", "F major",
            "F major",
        ]);
        (features, labels)
    }

    #[test]
    fn test_untrained_predict_fails() {
        let classifier = MarginClassifier::new(ClassifierConfig::default());
        assert!(!classifier.is_trained());
        assert!(matches!(
            classifier.predict(array![1.0, 2.0].view()),
            Err(EdmkeyError::NotTrained)
        ));
    }

    #[test]
    fn test_linear_separates_clusters() {
        let (features, labels) = clusters();
        let mut classifier = MarginClassifier::new(ClassifierConfig {
            kernel: Kernel::Linear,
            ..ClassifierConfig::default()
        });
        classifier.fit(features.view(), &labels).unwrap();

        assert_eq!(classifier.labels(), &["A minor", "C major", "F major"]);
        for (row, label) in features.outer_iter().zip(&labels) {
            assert_eq!(classifier.predict(row).unwrap(), label);
        }
        assert_eq!(classifier.predict(array![0.0, 0.0, 2.0].view()).unwrap(), "F major");
    }

    #[test]
    fn test_rbf_separates_clusters() {
        let (features, labels) = clusters();
        let mut classifier = MarginClassifier::new(ClassifierConfig::default());
        classifier.fit(features.view(), &labels).unwrap();

        let predicted = classifier.predict_batch(features.view()).unwrap();
        assert_eq!(predicted, labels);
        assert_eq!(classifier.predict(array![1.0, 0.0, 0.0].view()).unwrap(), "A minor");
    }

    #[test]
    fn test_dimension_mismatch() {
        let (features, labels) = clusters();
        let mut classifier = MarginClassifier::new(ClassifierConfig::default());
        classifier.fit(features.view(), &labels).unwrap();

        assert!(matches!(
            classifier.predict(array![1.0, 0.0].view()),
            Err(EdmkeyError::DimensionMismatch { expected: 3, found: 2 })
        ));
        assert!(matches!(
            classifier.predict_batch(Array2::<f64>::zeros((2, 4)).view()),
            Err(EdmkeyError::DimensionMismatch { expected: 3, found: 4 })
        ));
    }

    #[test]
    fn test_single_label_always_predicted() {
        let features = array![[0.0, 1.0], [1.0, 0.0]];
        let mut classifier = MarginClassifier::new(ClassifierConfig::default());
        classifier.fit(features.view(), &labels(&["E minor", "E minor"])).unwrap();
        assert_eq!(classifier.predict(array![5.0, 5.0].view()).unwrap(), "E minor");
    }

    #[test]
    fn test_label_count_mismatch() {
        let features = array![[0.0, 1.0], [1.0, 0.0]];
        let mut classifier = MarginClassifier::new(ClassifierConfig::default());
        assert!(matches!(
            classifier.fit(features.view(), &labels(&["x"])),
            Err(EdmkeyError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_training_is_deterministic() {
        let (features, labels) = clusters();
        let sample = array![0.5, 0.5, 0.4];
        let predict = || {
            let mut classifier = MarginClassifier::new(ClassifierConfig::default());
            classifier.fit(features.view(), &labels).unwrap();
            classifier.predict(sample.view()).unwrap().to_string()
        };
        assert_eq!(predict(), predict());
    }

    #[test]
    fn test_default_gamma() {
        let constant = Array2::<f64>::ones((3, 2));
        assert_eq!(default_gamma(constant.view()), 1.0);
        let spread = array![[0.0, 2.0], [2.0, 0.0]];
        // variance of [0, 2, 2, 0] is 1
        assert!((default_gamma(spread.view()) - 0.5).abs() < 1e-12);
    }
}
