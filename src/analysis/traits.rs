//! Analysis trait abstractions
//!
//! These traits define the seams of the key estimation pipeline. The chroma
//! and key stages only see spectral peaks, so the spectral backend can be
//! swapped without touching them.

use crate::error::Result;
use crate::types::{AudioBuffer, KeyOutcome, SpectralPeaks};

/// Spectral analysis backend: one frame of audio in, spectral peaks out
pub trait SpectralAnalyzer: Send + Sync {
    /// Find the spectral peaks of a single frame
    fn peaks(&self, frame: &[f32]) -> Result<SpectralPeaks>;

    /// Get the name of this analyzer (for logging)
    fn name(&self) -> &'static str;
}

/// Musical key detection backend
pub trait KeyDetector: Send + Sync {
    /// Estimate the key of a decoded recording
    fn detect(&self, buffer: &AudioBuffer) -> Result<KeyOutcome>;

    /// Get the name of this detector (for logging)
    fn name(&self) -> &'static str;
}
