//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// edmkey - Key estimation for electronic dance music
///
/// Estimates the tonic and mode of recordings from harmonic pitch class
/// profiles, and trains a margin classifier on the same chroma features.
#[derive(Parser, Debug)]
#[command(name = "edmkey")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only, no progress bars)
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Estimate the key of a file (or of every file in a directory)
    Analyze(AnalyzeArgs),
    /// Train a classifier on labeled chroma features and predict another set
    Classify(ClassifyArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// File (directory in batch mode) to analyse
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// File (directory in batch mode) to write results to
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Batch analyse a whole directory
    #[arg(short, long = "batch_mode", alias = "batch-mode", default_value = "false")]
    pub batch_mode: bool,

    /// Key template family (temperley, shaath, edma, edmm, bmtg1-3)
    #[arg(short, long, value_name = "NAME")]
    pub profile: Option<String>,

    /// JSON file with additional key template families
    #[arg(long, value_name = "FILE")]
    pub profiles_file: Option<PathBuf>,

    /// JSON file with analysis parameters
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Detuning correction scope: 'average' or 'frame'
    #[arg(long, value_name = "SCOPE")]
    pub detuning_scope: Option<String>,

    /// Zero aggregate chroma bins below this threshold
    #[arg(long, value_name = "THRESHOLD")]
    pub pcp_gate: Option<f32>,

    /// Number of worker threads in batch mode (defaults to CPU count - 1)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Also write an edmkey.json summary next to the results
    #[arg(long, default_value = "false")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// CSV with labeled chroma features to train on
    #[arg(value_name = "TRAINING_CSV")]
    pub training: PathBuf,

    /// CSV with chroma features to predict labels for
    #[arg(value_name = "ANALYSIS_CSV")]
    pub analysis: PathBuf,

    /// Decision boundary shape: 'linear' or 'rbf'
    #[arg(long, default_value = "rbf")]
    pub kernel: String,

    /// RBF kernel width (defaults to 1 / (features × variance))
    #[arg(long)]
    pub gamma: Option<f64>,

    /// Training passes over the dataset before giving up on convergence
    #[arg(long, default_value = "1000")]
    pub max_epochs: usize,

    /// Directory for .key files (defaults to the analysis CSV's directory)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Column holding the file name (index or header name)
    #[arg(long, default_value = "0")]
    pub filename_column: String,

    /// Column holding the ground-truth label (index or header name)
    #[arg(long, default_value = "78")]
    pub label_column: String,

    /// First feature column (inclusive)
    #[arg(long, default_value = "4")]
    pub feature_start: usize,

    /// Last feature column (exclusive)
    #[arg(long, default_value = "76")]
    pub feature_end: usize,

    /// CSV files have no header row
    #[arg(long, default_value = "false")]
    pub no_header: bool,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
