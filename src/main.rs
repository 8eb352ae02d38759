//! edmkey CLI entry point

use clap::Parser;
use edmkey::classifier;
use edmkey::config::{Cli, ClassifySettings, Command, Settings};
use edmkey::pipeline;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli);

    match &cli.command {
        Command::Analyze(args) => {
            let settings = match Settings::from_cli(&cli, args) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            run_analyze(&settings)
        }
        Command::Classify(args) => {
            let settings = match ClassifySettings::from_cli(args) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            run_classify(&settings)
        }
    }
}

fn run_analyze(settings: &Settings) -> ExitCode {
    match pipeline::run(settings) {
        Ok(result) => {
            if settings.batch_mode {
                println!();
                println!("{} audio files analysed", result.processed);
                if result.failed > 0 || result.skipped > 0 {
                    println!(
                        "Summary: {} failed, {} skipped (of {} total)",
                        result.failed, result.skipped, result.total_files
                    );
                }
            }

            if result.failed > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_classify(settings: &ClassifySettings) -> ExitCode {
    match classifier::run(settings) {
        Ok(summary) => {
            println!("{} files used for training", summary.training_rows);
            println!(
                "{} predictions appended to .key files in {}",
                summary.predicted_rows,
                summary.output_dir.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = cli.log_level().as_str().to_lowercase();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}
