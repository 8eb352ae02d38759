//! Runtime configuration settings

use super::analysis::AnalysisConfig;
use super::cli::{AnalyzeArgs, Cli, ClassifyArgs};
use crate::classifier::{ClassifierConfig, ColumnRef, DatasetLayout, Kernel};
use crate::error::{EdmkeyError, Result};
use std::path::PathBuf;

/// Runtime settings for the key estimation pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Input path (file, or directory in batch mode)
    pub input: PathBuf,
    /// Output path (file, or directory in batch mode)
    pub output: PathBuf,
    /// Analyse every recognized file in `input`
    pub batch_mode: bool,
    /// Analysis parameters
    pub analysis: AnalysisConfig,
    /// Extra key profile registry to load instead of the built-in one
    pub profiles_file: Option<PathBuf>,
    /// Number of analysis worker threads
    pub analysis_threads: usize,
    /// Write the JSON summary
    pub output_json: bool,
    /// Show progress bars
    pub show_progress: bool,
    /// Print one line per analysed file
    pub verbose: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    ///
    /// A `--config` file is loaded first; explicit flags override its values.
    pub fn from_cli(cli: &Cli, args: &AnalyzeArgs) -> Result<Self> {
        let mut analysis = match &args.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(profile) = &args.profile {
            analysis.key_profile = profile.clone();
        }
        if let Some(scope) = &args.detuning_scope {
            analysis.detuning_scope = scope.parse()?;
        }
        if let Some(threshold) = args.pcp_gate {
            analysis.pcp_gate = Some(threshold);
        }
        analysis.validate()?;

        let analysis_threads = args
            .threads
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
            .max(1);

        Ok(Self {
            input: args.input.clone(),
            output: args.output.clone(),
            batch_mode: args.batch_mode,
            analysis,
            profiles_file: args.profiles_file.clone(),
            analysis_threads,
            output_json: args.json,
            show_progress: !cli.quiet,
            verbose: cli.verbose > 0,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            output: PathBuf::from("./output"),
            batch_mode: false,
            analysis: AnalysisConfig::default(),
            profiles_file: None,
            analysis_threads: num_cpus::get().saturating_sub(1).max(1),
            output_json: false,
            show_progress: true,
            verbose: false,
        }
    }
}

/// Runtime settings for the classifier workflow
#[derive(Debug, Clone)]
pub struct ClassifySettings {
    /// Labeled feature table
    pub training: PathBuf,
    /// Unlabeled feature table
    pub analysis: PathBuf,
    /// Where .key files go (None = next to the analysis table)
    pub output_dir: Option<PathBuf>,
    /// Column layout shared by both tables
    pub layout: DatasetLayout,
    pub classifier: ClassifierConfig,
}

impl ClassifySettings {
    /// Create settings from CLI arguments
    pub fn from_cli(args: &ClassifyArgs) -> Result<Self> {
        let kernel = match args.kernel.trim().to_lowercase().as_str() {
            "linear" => Kernel::Linear,
            "rbf" => Kernel::Rbf { gamma: args.gamma },
            other => {
                return Err(EdmkeyError::ConfigError(format!(
                    "kernel must be 'linear' or 'rbf', got '{}'",
                    other
                )))
            }
        };

        if args.feature_end <= args.feature_start {
            return Err(EdmkeyError::ConfigError(format!(
                "feature columns [{}, {}) are empty",
                args.feature_start, args.feature_end
            )));
        }

        Ok(Self {
            training: args.training.clone(),
            analysis: args.analysis.clone(),
            output_dir: args.output_dir.clone(),
            layout: DatasetLayout {
                filename_column: ColumnRef::parse(&args.filename_column),
                label_column: ColumnRef::parse(&args.label_column),
                feature_columns: args.feature_start..args.feature_end,
                has_headers: !args.no_header,
            },
            classifier: ClassifierConfig {
                kernel,
                max_epochs: args.max_epochs,
                ..ClassifierConfig::default()
            },
        })
    }
}
