//! Audio loading and framing

pub mod decoder;
pub mod frames;

pub use decoder::decode;
pub use frames::{select_segment, FrameCutter};
