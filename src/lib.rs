//! edmkey - Musical key estimation for electronic dance music
//!
//! A command-line utility and library that estimates the key (tonic and
//! mode) of audio recordings by folding spectral peaks into a harmonic
//! pitch class profile and correlating it against key profile templates.
//! A companion workflow trains a classifier on exported chroma features.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing, analysis parameters and runtime settings
//! - `discovery`: Batch input scanning
//! - `audio`: Audio decoding using symphonia, segment selection and framing
//! - `analysis`: Spectral peaks, chroma extraction, tuning correction,
//!   aggregation and key profile matching (with swappable backends)
//! - `pipeline`: Single-file and parallel batch orchestration
//! - `export`: Result files and the JSON summary
//! - `classifier`: Feature tables, margin classifier and prediction workflow
//!
//! # Example
//!
//! ```no_run
//! use edmkey::{config::Settings, pipeline};
//! use std::path::PathBuf;
//!
//! let settings = Settings {
//!     input: PathBuf::from("/music/incoming"),
//!     output: PathBuf::from("/music/keys"),
//!     batch_mode: true,
//!     ..Settings::default()
//! };
//! let result = pipeline::run(&settings).expect("Analysis failed");
//! println!("{} audio files analysed", result.processed);
//! ```

pub mod analysis;
pub mod audio;
pub mod classifier;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod types;

// Re-export key types at crate root
pub use error::{EdmkeyError, Result};
pub use types::{AnalyzedRecording, AudioBuffer, ChromaVector, KeyEstimate, KeyOutcome, Mode, PitchClass};
