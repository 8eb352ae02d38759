//! Supervised key classification on chroma feature tables

pub mod dataset;
pub mod model;
pub mod workflow;

pub use dataset::{ColumnRef, DatasetLayout, FeatureTable, TrainingDataset};
pub use model::{ClassifierConfig, Kernel, MarginClassifier};
pub use workflow::{run, ClassificationSummary};
