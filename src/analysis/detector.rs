//! Chroma-based key detector
//!
//! Composes the per-recording pipeline: segment selection, framing,
//! spectral peaks, per-frame chroma, aggregation with tuning correction,
//! and key profile matching. Frames of one recording are processed
//! strictly in order.

use crate::analysis::aggregate::{AggregateOutcome, ChromaAggregator};
use crate::analysis::chroma::ChromaExtractor;
use crate::analysis::key::{KeyProfileMatcher, ProfileRegistry};
use crate::analysis::spectral::FftSpectralAnalyzer;
use crate::analysis::traits::{KeyDetector, SpectralAnalyzer};
use crate::audio::{select_segment, FrameCutter};
use crate::config::AnalysisConfig;
use crate::error::{EdmkeyError, Result};
use crate::types::{AudioBuffer, KeyOutcome};
use std::path::PathBuf;
use tracing::debug;

/// Key detector built from an [`AnalysisConfig`] and a profile family
pub struct ChromaKeyDetector {
    config: AnalysisConfig,
    analyzer: Box<dyn SpectralAnalyzer>,
    extractor: ChromaExtractor,
    matcher: KeyProfileMatcher,
}

impl ChromaKeyDetector {
    /// Detector using the rustfft spectral analyzer
    pub fn new(config: &AnalysisConfig, registry: &ProfileRegistry) -> Result<Self> {
        Self::with_analyzer(config, registry, Box::new(FftSpectralAnalyzer::new(config)))
    }

    /// Detector using a caller-provided spectral backend
    pub fn with_analyzer(
        config: &AnalysisConfig,
        registry: &ProfileRegistry,
        analyzer: Box<dyn SpectralAnalyzer>,
    ) -> Result<Self> {
        config.validate()?;
        let profile = registry.get(&config.key_profile)?;
        let matcher = KeyProfileMatcher::new(profile, config.hpcp.size)?;

        Ok(Self {
            config: config.clone(),
            analyzer,
            extractor: ChromaExtractor::new(config),
            matcher,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn profile_name(&self) -> &str {
        self.matcher.profile_name()
    }

    /// Aggregate chroma of a recording, before key matching
    pub fn aggregate(&self, buffer: &AudioBuffer) -> Result<AggregateOutcome> {
        if buffer.sample_rate != self.config.sample_rate {
            return Err(EdmkeyError::AnalysisError {
                path: PathBuf::new(),
                reason: format!(
                    "buffer sample rate {} Hz does not match analysis rate {} Hz",
                    buffer.sample_rate, self.config.sample_rate
                ),
            });
        }

        let segment = select_segment(&buffer.samples, buffer.sample_rate, &self.config);
        let frames = FrameCutter::new(segment, self.config.frame_size, self.config.hop_size);
        let frame_count = frames.frame_count();

        let mut aggregator = ChromaAggregator::new(&self.config);
        for frame in frames {
            let peaks = self.analyzer.peaks(&frame)?;
            let chroma = self.extractor.extract(&peaks);
            aggregator.push(&chroma)?;
        }

        debug!(
            "{} of {} frames carried chroma ({} samples analysed, backend {})",
            aggregator.contributing_frames(),
            frame_count,
            segment.len(),
            self.analyzer.name()
        );

        Ok(aggregator.finish())
    }
}

impl KeyDetector for ChromaKeyDetector {
    fn detect(&self, buffer: &AudioBuffer) -> Result<KeyOutcome> {
        match self.aggregate(buffer)? {
            AggregateOutcome::Silence => {
                debug!("No chroma energy in any frame, reporting silence");
                Ok(KeyOutcome::Silence)
            }
            AggregateOutcome::Chroma(chroma) => {
                let estimate = self.matcher.estimate(&chroma)?;
                debug!(
                    "Detected key: {} {} (strength {:.3}, relative {:.3})",
                    estimate.tonic, estimate.mode, estimate.strength, estimate.relative_strength
                );
                Ok(KeyOutcome::Key(estimate))
            }
        }
    }

    fn name(&self) -> &'static str {
        "hpcp-profile"
    }
}
