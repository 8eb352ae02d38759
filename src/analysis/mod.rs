//! Audio analysis modules
//!
//! This module provides traits for analysis backends and the chroma-based
//! key estimation pipeline built on them. The trait abstraction allows
//! swapping the spectral backend without changing chroma or key code.

pub mod aggregate;
pub mod chroma;
pub mod detector;
pub mod key;
pub mod spectral;
pub mod traits;
pub mod tuning;

pub use traits::{KeyDetector, SpectralAnalyzer};

pub use aggregate::{AggregateOutcome, ChromaAggregator};
pub use chroma::ChromaExtractor;
pub use detector::ChromaKeyDetector;
pub use key::{KeyProfile, KeyProfileMatcher, ProfileRegistry};
pub use spectral::FftSpectralAnalyzer;
pub use tuning::{pcp_gate, shift_pcp, TuningCorrector};
