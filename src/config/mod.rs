//! Configuration and CLI handling

pub mod analysis;
pub mod cli;
pub mod settings;

pub use analysis::{AnalysisConfig, DetuningScope, HpcpConfig, WeightType, WindowShape};
pub use cli::{AnalyzeArgs, Cli, ClassifyArgs, Command};
pub use settings::{ClassifySettings, Settings};
