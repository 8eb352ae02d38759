//! Frame chroma aggregation
//!
//! Sums the chroma vectors of all non-silent frames into a single vector
//! for the whole segment, applying tuning correction either per frame or
//! once on the aggregate.

use crate::analysis::tuning::{pcp_gate, TuningCorrector};
use crate::config::{AnalysisConfig, DetuningScope};
use crate::error::{EdmkeyError, Result};
use crate::types::ChromaVector;
use std::path::PathBuf;

/// Result of aggregating a segment
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateOutcome {
    /// Aggregated (and corrected) chroma of the segment
    Chroma(ChromaVector),
    /// No frame carried any chroma energy
    Silence,
}

/// Running sum of frame chroma vectors
#[derive(Debug, Clone)]
pub struct ChromaAggregator {
    correction: Option<DetuningScope>,
    corrector: TuningCorrector,
    gate: Option<f32>,
    sum: ChromaVector,
    frames: usize,
}

impl ChromaAggregator {
    pub fn new(config: &AnalysisConfig) -> Self {
        let size = config.hpcp.size;
        Self {
            correction: config.detuning_correction.then_some(config.detuning_scope),
            corrector: TuningCorrector::new(size),
            gate: config.pcp_gate,
            sum: ChromaVector::zeros(size),
            frames: 0,
        }
    }

    /// Add one frame; frames with zero total energy are skipped
    ///
    /// Returns whether the frame contributed to the aggregate.
    pub fn push(&mut self, chroma: &ChromaVector) -> Result<bool> {
        if chroma.len() != self.sum.len() {
            return Err(EdmkeyError::AnalysisError {
                path: PathBuf::new(),
                reason: format!(
                    "chroma frame has {} bins, aggregate has {}",
                    chroma.len(),
                    self.sum.len()
                ),
            });
        }
        if chroma.sum() <= 0.0 {
            return Ok(false);
        }

        if self.correction == Some(DetuningScope::Frame) {
            self.sum.accumulate(&self.corrector.correct(chroma));
        } else {
            self.sum.accumulate(chroma);
        }
        self.frames += 1;
        Ok(true)
    }

    /// Number of frames that contributed so far
    pub fn contributing_frames(&self) -> usize {
        self.frames
    }

    /// Close the segment
    pub fn finish(self) -> AggregateOutcome {
        if self.frames == 0 {
            return AggregateOutcome::Silence;
        }

        let chroma = match self.correction {
            Some(DetuningScope::Average) => self.corrector.correct(&self.sum),
            _ => self.sum,
        };
        let chroma = match self.gate {
            Some(threshold) => pcp_gate(&chroma, threshold),
            None => chroma,
        };
        AggregateOutcome::Chroma(chroma)
    }

    /// Aggregate a complete sequence of frames
    pub fn aggregate<'a, I>(config: &AnalysisConfig, frames: I) -> Result<AggregateOutcome>
    where
        I: IntoIterator<Item = &'a ChromaVector>,
    {
        let mut aggregator = Self::new(config);
        for chroma in frames {
            aggregator.push(chroma)?;
        }
        Ok(aggregator.finish())
    }
}
