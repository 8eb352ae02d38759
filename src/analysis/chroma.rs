//! Harmonic pitch class profile (HPCP) extraction
//!
//! Folds the spectral peaks of one frame into a circular chroma vector of
//! `size` bins. Bin 0 sits on the reference frequency (A4 by default) and
//! each semitone spans `size / 12` bins.
//!
//! Every peak also credits the pitch classes of the fundamentals it could be
//! a harmonic of (`f / k`), with a strength that decays with the harmonic's
//! distance in octaves.

use crate::config::{AnalysisConfig, HpcpConfig, WeightType};
use crate::types::{ChromaVector, SpectralPeaks};
use std::f32::consts::PI;

/// Harmonics closer than this (in semitones) are merged into one entry
const HARMONIC_MERGE_PRECISION: f32 = 1e-5;

/// Pitch class offset of a harmonic and its contribution weight
#[derive(Debug, Clone, Copy, PartialEq)]
struct HarmonicPeak {
    semitone: f32,
    strength: f32,
}

/// Stateless per-frame chroma extractor
#[derive(Debug, Clone)]
pub struct ChromaExtractor {
    config: HpcpConfig,
    min_frequency: f32,
    max_frequency: f32,
    harmonics: Vec<HarmonicPeak>,
}

impl ChromaExtractor {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.hpcp.clone(),
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency,
            harmonics: harmonic_table(config.hpcp.harmonics),
        }
    }

    /// Number of bins in the produced vectors
    pub fn size(&self) -> usize {
        self.config.size
    }

    /// Build the chroma vector of one frame from its spectral peaks
    pub fn extract(&self, peaks: &SpectralPeaks) -> ChromaVector {
        let size = self.config.size;
        let mut low = vec![0.0f32; size];
        let mut high = vec![0.0f32; size];

        for (frequency, magnitude) in peaks.iter() {
            if magnitude <= 0.0
                || frequency < self.min_frequency
                || frequency > self.max_frequency
            {
                continue;
            }
            let target = if self.config.band_preset && frequency >= self.config.split_frequency {
                &mut high
            } else {
                &mut low
            };
            self.add_peak(target, frequency, magnitude);
        }

        let mut chroma = if self.config.band_preset {
            let mut low = ChromaVector::new(low);
            let mut high = ChromaVector::new(high);
            low.normalize_max();
            high.normalize_max();
            low.accumulate(&high);
            low
        } else {
            ChromaVector::new(low)
        };

        if self.config.max_shifted {
            let peak = chroma.argmax();
            chroma.rotate_down(peak);
        }
        if self.config.normalize {
            chroma.normalize_max();
        }
        if self.config.non_linear {
            apply_non_linear(&mut chroma);
        }
        chroma
    }

    /// Spread one peak over the histogram at its own pitch class and those of
    /// its sub-harmonics
    fn add_peak(&self, hpcp: &mut [f32], frequency: f32, magnitude: f32) {
        let size = self.config.size as f32;
        let resolution = self.config.resolution() as f32;
        let position = size * (frequency / self.config.reference_frequency).log2();

        for harmonic in &self.harmonics {
            let bin = position - harmonic.semitone * resolution;
            let energy = (magnitude * harmonic.strength).powi(2);
            self.add_contribution(hpcp, bin, energy);
        }
    }

    fn add_contribution(&self, hpcp: &mut [f32], bin: f32, energy: f32) {
        let size = hpcp.len() as i64;
        let resolution = self.config.resolution() as f32;

        let width = self.config.window_semitones;
        let half_width = resolution * width / 2.0;

        match self.config.weight_type {
            WeightType::None => {
                let index = (bin.round() as i64).rem_euclid(size) as usize;
                hpcp[index] += energy;
            }
            WeightType::Cosine | WeightType::SquaredCosine => {
                let first = (bin - half_width).ceil() as i64;
                let last = (bin + half_width).floor() as i64;
                for i in first..=last {
                    let distance = (bin - i as f32).abs() / resolution / width;
                    let mut weight = (PI * distance).cos().max(0.0);
                    if self.config.weight_type == WeightType::SquaredCosine {
                        weight *= weight;
                    }
                    hpcp[i.rem_euclid(size) as usize] += weight * energy;
                }
            }
        }
    }
}

/// Harmonics 1..=harmonics+1 folded into pitch class offsets
///
/// Harmonics landing on the same pitch class (the octaves of the
/// fundamental, for instance) are merged by adding their strengths.
fn harmonic_table(harmonics: usize) -> Vec<HarmonicPeak> {
    let mut table: Vec<HarmonicPeak> = Vec::new();

    for multiple in 1..=harmonics + 1 {
        let semitone = 12.0 * (multiple as f32).log2();
        let strength = 1.0 / (semitone / 12.0 * 0.5).max(1.0);
        let folded = semitone.rem_euclid(12.0);
        let folded = if 12.0 - folded < HARMONIC_MERGE_PRECISION { 0.0 } else { folded };

        match table
            .iter_mut()
            .find(|h| (h.semitone - folded).abs() < HARMONIC_MERGE_PRECISION)
        {
            Some(existing) => existing.strength += strength,
            None => table.push(HarmonicPeak {
                semitone: folded,
                strength,
            }),
        }
    }
    table
}

/// Emphasise strong bins and suppress weak ones
///
/// Expects a max-normalized vector: `v = sin(v * pi / 2)^2`, then values
/// below 0.6 are further attenuated by `(v / 0.6)^2`.
fn apply_non_linear(chroma: &mut ChromaVector) {
    for value in chroma.bins_mut() {
        let mut v = (*value * PI / 2.0).sin();
        v *= v;
        if v < 0.6 {
            v *= (v / 0.6) * (v / 0.6);
        }
        *value = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.hpcp.non_linear = false;
        config.hpcp.harmonics = 0;
        config
    }

    fn single_peak(frequency: f32) -> SpectralPeaks {
        SpectralPeaks::new(vec![frequency], vec![1.0])
    }

    #[test]
    fn test_reference_frequency_lands_on_bin_zero() {
        let extractor = ChromaExtractor::new(&linear_config());
        let chroma = extractor.extract(&single_peak(440.0));
        assert_eq!(chroma.len(), 36);
        assert_eq!(chroma.argmax(), 0);
        assert!((chroma.bins()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_octaves_fold_onto_same_bin() {
        let extractor = ChromaExtractor::new(&linear_config());
        for frequency in [110.0, 220.0, 880.0, 1760.0] {
            assert_eq!(extractor.extract(&single_peak(frequency)).argmax(), 0);
        }
    }

    #[test]
    fn test_semitone_moves_by_resolution() {
        let extractor = ChromaExtractor::new(&linear_config());
        // C5 is three semitones above A4
        let chroma = extractor.extract(&single_peak(523.251));
        assert_eq!(chroma.argmax(), 9);
    }

    #[test]
    fn test_cosine_window_spreads_to_neighbours() {
        let extractor = ChromaExtractor::new(&linear_config());
        // a sixth of a semitone sharp sits between two bins
        let frequency = 440.0 * 2f32.powf(0.5 / 36.0);
        let chroma = extractor.extract(&single_peak(frequency));
        assert!(chroma.bins()[0] > 0.9);
        assert!(chroma.bins()[1] > 0.9);
        assert_eq!(chroma.bins()[18], 0.0);
    }

    #[test]
    fn test_no_weighting_uses_single_bin() {
        let mut config = linear_config();
        config.hpcp.weight_type = WeightType::None;
        let extractor = ChromaExtractor::new(&config);
        let chroma = extractor.extract(&single_peak(442.0));
        assert_eq!(chroma.bins().iter().filter(|&&v| v > 0.0).count(), 1);
    }

    #[test]
    fn test_peaks_outside_band_are_ignored() {
        let extractor = ChromaExtractor::new(&linear_config());
        let chroma = extractor.extract(&single_peak(10.0));
        assert_eq!(chroma.sum(), 0.0);
    }

    #[test]
    fn test_harmonics_credit_fundamental_below() {
        let mut config = linear_config();
        config.hpcp.harmonics = 2;
        let extractor = ChromaExtractor::new(&config);
        let chroma = extractor.extract(&single_peak(220.0));
        // A is the third harmonic of D, seven semitones below
        assert!(chroma.bins()[15] > 0.0);
        assert_eq!(chroma.bins()[21], 0.0);
        assert_eq!(chroma.argmax(), 0);
    }

    #[test]
    fn test_fifth_partial_folds_back_onto_root() {
        let mut config = linear_config();
        config.hpcp.harmonics = 2;
        let extractor = ChromaExtractor::new(&config);
        // E5 is the third partial of A3
        let chroma = extractor.extract(&single_peak(659.255));
        assert!(chroma.bins()[0] > 0.0);
        assert_eq!(chroma.argmax(), 21);
    }

    #[test]
    fn test_harmonic_table_merges_octaves() {
        let table = harmonic_table(3);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].semitone, 0.0);
        assert!((table[0].strength - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_max_shifted_puts_peak_first() {
        let mut config = linear_config();
        config.hpcp.max_shifted = true;
        let extractor = ChromaExtractor::new(&config);
        let chroma = extractor.extract(&single_peak(523.251));
        assert_eq!(chroma.argmax(), 0);
    }

    #[test]
    fn test_non_linear_keeps_unit_max() {
        let mut config = AnalysisConfig::default();
        config.hpcp.harmonics = 0;
        let extractor = ChromaExtractor::new(&config);
        let peaks = SpectralPeaks::new(vec![440.0, 523.251], vec![1.0, 0.3]);
        let chroma = extractor.extract(&peaks);
        assert!((chroma.max() - 1.0).abs() < 1e-6);
        // 0.09 energy ratio is pushed down hard
        assert!(chroma.bins()[9] < 0.01);
    }

    #[test]
    fn test_band_preset_balances_bands() {
        let mut config = linear_config();
        config.hpcp.band_preset = true;
        let extractor = ChromaExtractor::new(&config);
        let peaks = SpectralPeaks::new(vec![110.0, 523.251], vec![1.0, 0.1]);
        let chroma = extractor.extract(&peaks);
        assert!((chroma.bins()[0] - chroma.bins()[9]).abs() < 1e-4);
    }
}
