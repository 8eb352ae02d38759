//! Audio file discovery

pub mod scanner;

pub use scanner::{result_path, scan, split_result_collisions, DiscoveredFile};
