//! Analysis parameters
//!
//! One immutable record handed to every component at construction time.
//! Defaults reproduce the reference EDM key estimation settings.

use crate::error::{EdmkeyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Window applied to each frame before the FFT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowShape {
    Hann,
    Hamming,
    Blackman,
    #[serde(alias = "blackmanharris")]
    BlackmanHarris92,
    Square,
}

/// Shape of the HPCP weighting window around each pitch position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightType {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "cosine")]
    Cosine,
    #[serde(rename = "squaredCosine", alias = "squared-cosine")]
    SquaredCosine,
}

/// Where detuning correction is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetuningScope {
    /// Once, on the aggregate chroma of the recording
    Average,
    /// On every frame before accumulation
    Frame,
}

impl FromStr for DetuningScope {
    type Err = EdmkeyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "average" => Ok(DetuningScope::Average),
            "frame" => Ok(DetuningScope::Frame),
            other => Err(EdmkeyError::ConfigError(format!(
                "detuning correction scope must be 'frame' or 'average', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DetuningScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetuningScope::Average => f.write_str("average"),
            DetuningScope::Frame => f.write_str("frame"),
        }
    }
}

/// Harmonic pitch class profile parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HpcpConfig {
    /// Number of bins (12 × bins per semitone)
    pub size: usize,
    /// Harmonic multiples considered above the fundamental
    pub harmonics: usize,
    /// Frequency of bin 0 in Hz
    pub reference_frequency: f32,
    pub weight_type: WeightType,
    /// Width of the weighting window in semitones
    pub window_semitones: f32,
    pub non_linear: bool,
    /// Scale each frame so its maximum is 1
    pub normalize: bool,
    /// Build separate low/high band profiles split at `split_frequency`
    pub band_preset: bool,
    pub split_frequency: f32,
    /// Rotate each frame so its maximum lands on bin 0
    pub max_shifted: bool,
}

impl Default for HpcpConfig {
    fn default() -> Self {
        Self {
            size: 36,
            harmonics: 4,
            reference_frequency: 440.0,
            weight_type: WeightType::Cosine,
            window_semitones: 1.0,
            non_linear: true,
            normalize: true,
            band_preset: false,
            split_frequency: 250.0,
            max_shifted: false,
        }
    }
}

impl HpcpConfig {
    /// Bins per semitone
    pub fn resolution(&self) -> usize {
        self.size / 12
    }
}

/// Analysis configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // File settings
    /// Rate audio is resampled to before analysis
    pub sample_rate: u32,

    // Framing and spectrum
    pub frame_size: usize,
    pub hop_size: usize,
    pub window: WindowShape,
    pub min_frequency: f32,
    pub max_frequency: f32,
    pub spectral_whitening: bool,
    /// Minimum linear magnitude of a spectral peak
    pub peak_threshold: f32,
    pub max_peaks: usize,

    // Chroma
    pub hpcp: HpcpConfig,
    pub detuning_correction: bool,
    pub detuning_scope: DetuningScope,
    /// Zero aggregate bins below this value after correction
    pub pcp_gate: Option<f32>,

    // Scope
    /// Percentage of the recording ignored at each edge
    pub avoid_edges_percent: f32,
    /// Analyse only the first n seconds (0 = whole recording)
    pub first_n_seconds: u32,
    pub skip_first_minute: bool,

    // Key detector
    pub key_profile: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let frame_size = 4096;
        Self {
            sample_rate: 44100,
            frame_size,
            hop_size: 4 * frame_size,
            window: WindowShape::Hann,
            min_frequency: 25.0,
            max_frequency: 3500.0,
            spectral_whitening: true,
            peak_threshold: 0.0001,
            max_peaks: 60,
            hpcp: HpcpConfig::default(),
            detuning_correction: true,
            detuning_scope: DetuningScope::Average,
            pcp_gate: None,
            avoid_edges_percent: 0.0,
            first_n_seconds: 0,
            skip_first_minute: false,
            key_profile: "edma".to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EdmkeyError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            EdmkeyError::ConfigError(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(EdmkeyError::ConfigError(msg));

        if self.sample_rate == 0 {
            return fail("sample_rate must be positive".into());
        }
        if self.frame_size < 2 || self.hop_size == 0 {
            return fail(format!(
                "frame_size ({}) and hop_size ({}) must be positive",
                self.frame_size, self.hop_size
            ));
        }
        if self.hpcp.size < 12 || self.hpcp.size % 12 != 0 {
            return fail(format!(
                "hpcp size must be a positive multiple of 12, got {}",
                self.hpcp.size
            ));
        }
        if !(self.min_frequency >= 0.0 && self.min_frequency < self.max_frequency) {
            return fail(format!(
                "frequency band [{}, {}] Hz is empty",
                self.min_frequency, self.max_frequency
            ));
        }
        if self.hpcp.reference_frequency <= 0.0 {
            return fail("hpcp reference_frequency must be positive".into());
        }
        if self.hpcp.window_semitones <= 0.0 {
            return fail("hpcp window_semitones must be positive".into());
        }
        if self.hpcp.non_linear && !self.hpcp.normalize {
            return fail("hpcp non_linear requires normalize".into());
        }
        if let Some(threshold) = self.pcp_gate {
            if threshold < 0.0 {
                return fail(format!("pcp_gate threshold must be >= 0, got {}", threshold));
            }
        }
        if !(0.0..50.0).contains(&self.avoid_edges_percent) {
            return fail(format!(
                "avoid_edges_percent must be in [0, 50), got {}",
                self.avoid_edges_percent
            ));
        }
        Ok(())
    }
}
