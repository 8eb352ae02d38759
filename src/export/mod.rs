//! Export modules for result files and the JSON batch summary

pub mod json;
pub mod text;

pub use json::{write_json, SUMMARY_FILE_NAME};
pub use text::{append_prediction, prediction_path, write_result};
