//! FFT-based spectral peak analysis
//!
//! Reference implementation of [`SpectralAnalyzer`]: window the frame, take
//! the magnitude spectrum with rustfft, pick local maxima with parabolic
//! interpolation, and optionally whiten the peak magnitudes against the
//! local spectral envelope.

use crate::analysis::traits::SpectralAnalyzer;
use crate::config::{AnalysisConfig, WindowShape};
use crate::error::{EdmkeyError, Result};
use crate::types::SpectralPeaks;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::path::PathBuf;
use std::sync::Arc;

/// Half width of the band used to estimate the spectral envelope (Hz)
const WHITENING_HALF_BAND_HZ: f32 = 50.0;

/// Spectral peak picker backed by rustfft
pub struct FftSpectralAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    sample_rate: f32,
    min_frequency: f32,
    max_frequency: f32,
    magnitude_threshold: f32,
    max_peaks: usize,
    whitening: bool,
}

impl FftSpectralAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.frame_size);

        Self {
            fft,
            window: window(config.window, config.frame_size),
            sample_rate: config.sample_rate as f32,
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency,
            magnitude_threshold: config.peak_threshold,
            max_peaks: config.max_peaks,
            whitening: config.spectral_whitening,
        }
    }

    fn frame_size(&self) -> usize {
        self.window.len()
    }

    /// Magnitude spectrum (bins 0..=N/2) of a windowed frame
    fn magnitude_spectrum(&self, frame: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .zip(self.window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();

        self.fft.process(&mut buffer);

        buffer[..self.frame_size() / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .collect()
    }

    /// Local maxima above the threshold inside the frequency band
    fn pick_peaks(&self, spectrum: &[f32]) -> Vec<(f32, f32)> {
        let bin_hz = self.sample_rate / self.frame_size() as f32;
        let mut peaks = Vec::new();

        for k in 1..spectrum.len().saturating_sub(1) {
            let (left, center, right) = (spectrum[k - 1], spectrum[k], spectrum[k + 1]);
            if center <= self.magnitude_threshold || center <= left || center < right {
                continue;
            }

            let (offset, height) = parabolic_interpolation(left, center, right);
            let frequency = (k as f32 + offset) * bin_hz;
            if frequency < self.min_frequency || frequency > self.max_frequency {
                continue;
            }
            peaks.push((frequency, height));
        }

        if peaks.len() > self.max_peaks {
            peaks.sort_by(|a, b| b.1.total_cmp(&a.1));
            peaks.truncate(self.max_peaks);
        }
        peaks.sort_by(|a, b| a.0.total_cmp(&b.0));
        peaks
    }

    /// Divide each peak magnitude by the mean magnitude around it
    fn whiten(&self, spectrum: &[f32], peaks: &mut [(f32, f32)]) {
        let bin_hz = self.sample_rate / self.frame_size() as f32;
        let half_band = (WHITENING_HALF_BAND_HZ / bin_hz).ceil().max(1.0) as usize;

        for (frequency, magnitude) in peaks.iter_mut() {
            let center = (*frequency / bin_hz).round() as usize;
            let lo = center.saturating_sub(half_band);
            let hi = (center + half_band).min(spectrum.len() - 1);
            let band = &spectrum[lo..=hi];
            let envelope = band.iter().sum::<f32>() / band.len() as f32;
            if envelope > 0.0 {
                *magnitude /= envelope;
            }
        }
    }
}

impl SpectralAnalyzer for FftSpectralAnalyzer {
    fn peaks(&self, frame: &[f32]) -> Result<SpectralPeaks> {
        if frame.len() != self.frame_size() {
            return Err(EdmkeyError::AnalysisError {
                path: PathBuf::new(),
                reason: format!(
                    "frame has {} samples, analyzer expects {}",
                    frame.len(),
                    self.frame_size()
                ),
            });
        }

        let spectrum = self.magnitude_spectrum(frame);
        let mut peaks = self.pick_peaks(&spectrum);
        if self.whitening {
            self.whiten(&spectrum, &mut peaks);
        }

        let (frequencies, magnitudes) = peaks.into_iter().unzip();
        Ok(SpectralPeaks::new(frequencies, magnitudes))
    }

    fn name(&self) -> &'static str {
        "rustfft"
    }
}

/// Vertex of the parabola through three neighbouring bins
///
/// Returns (offset from the center bin in bins, interpolated height).
fn parabolic_interpolation(left: f32, center: f32, right: f32) -> (f32, f32) {
    let denominator = left - 2.0 * center + right;
    if denominator == 0.0 {
        return (0.0, center);
    }
    let offset = (0.5 * (left - right) / denominator).clamp(-0.5, 0.5);
    let height = center - 0.25 * (left - right) * offset;
    (offset, height)
}

/// Window coefficients scaled to an area of 2
///
/// With this scaling a full-scale sinusoid produces a unit spectral peak.
pub fn window(shape: WindowShape, size: usize) -> Vec<f32> {
    let denominator = (size.max(2) - 1) as f32;
    let mut coefficients: Vec<f32> = (0..size)
        .map(|i| {
            let x = 2.0 * PI * i as f32 / denominator;
            match shape {
                WindowShape::Hann => 0.5 - 0.5 * x.cos(),
                WindowShape::Hamming => 0.54 - 0.46 * x.cos(),
                WindowShape::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                WindowShape::BlackmanHarris92 => {
                    0.35875 - 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos()
                        - 0.01168 * (3.0 * x).cos()
                }
                WindowShape::Square => 1.0,
            }
        })
        .collect();

    let area: f32 = coefficients.iter().sum();
    if area > 0.0 {
        let scale = 2.0 / area;
        coefficients.iter_mut().for_each(|w| *w *= scale);
    }
    coefficients
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, amplitude: f32, config: &AnalysisConfig) -> Vec<f32> {
        (0..config.frame_size)
            .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / config.sample_rate as f32).sin())
            .collect()
    }

    fn plain_config() -> AnalysisConfig {
        AnalysisConfig {
            spectral_whitening: false,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_window_area_is_two() {
        for shape in [
            WindowShape::Hann,
            WindowShape::Hamming,
            WindowShape::Blackman,
            WindowShape::BlackmanHarris92,
            WindowShape::Square,
        ] {
            let w = window(shape, 1024);
            let area: f32 = w.iter().sum();
            assert!((area - 2.0).abs() < 1e-3, "{:?} area {}", shape, area);
        }
    }

    #[test]
    fn test_sine_peak_frequency_and_magnitude() {
        let config = plain_config();
        let analyzer = FftSpectralAnalyzer::new(&config);
        let peaks = analyzer.peaks(&sine(440.0, 0.5, &config)).unwrap();

        let (frequency, magnitude) = peaks
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap();
        assert!((frequency - 440.0).abs() < 2.0, "peak at {}", frequency);
        assert!((magnitude - 0.5).abs() < 0.05, "magnitude {}", magnitude);
    }

    #[test]
    fn test_silent_frame_has_no_peaks() {
        let config = AnalysisConfig::default();
        let analyzer = FftSpectralAnalyzer::new(&config);
        let peaks = analyzer.peaks(&vec![0.0; config.frame_size]).unwrap();
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_peaks_respect_band_and_cap() {
        let config = AnalysisConfig {
            max_peaks: 2,
            min_frequency: 200.0,
            max_frequency: 1000.0,
            ..plain_config()
        };
        let analyzer = FftSpectralAnalyzer::new(&config);
        let frame: Vec<f32> = sine(100.0, 0.3, &config)
            .iter()
            .zip(sine(300.0, 0.3, &config))
            .zip(sine(500.0, 0.2, &config))
            .zip(sine(700.0, 0.1, &config))
            .map(|(((a, b), c), d)| a + b + c + d)
            .collect();

        let peaks = analyzer.peaks(&frame).unwrap();
        assert_eq!(peaks.len(), 2);
        assert!((peaks.frequencies[0] - 300.0).abs() < 3.0);
        assert!((peaks.frequencies[1] - 500.0).abs() < 3.0);
    }

    #[test]
    fn test_wrong_frame_size_is_rejected() {
        let analyzer = FftSpectralAnalyzer::new(&AnalysisConfig::default());
        assert!(analyzer.peaks(&[0.0; 16]).is_err());
    }
}
