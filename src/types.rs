//! Core data types for edmkey
//!
//! These types represent the domain model and flow through the pipeline:
//! audio buffers in, spectral peaks and chroma vectors in the middle,
//! key estimates out.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// Musical primitives
// =============================================================================

/// The 12 pitch classes in Western music
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    Cs, // C#/Db
    D,
    Ds, // D#/Eb
    E,
    F,
    Fs, // F#/Gb
    G,
    Gs, // G#/Ab
    A,
    As, // A#/Bb
    B,
}

const ALL_PITCH_CLASSES: [PitchClass; 12] = [
    PitchClass::C,
    PitchClass::Cs,
    PitchClass::D,
    PitchClass::Ds,
    PitchClass::E,
    PitchClass::F,
    PitchClass::Fs,
    PitchClass::G,
    PitchClass::Gs,
    PitchClass::A,
    PitchClass::As,
    PitchClass::B,
];

impl PitchClass {
    /// Convert from numeric index (0 = C, 1 = C#, ..., 11 = B), wrapping modulo 12
    pub fn from_index(index: usize) -> Self {
        ALL_PITCH_CLASSES[index % 12]
    }

    /// Pitch class a given number of semitones above A
    ///
    /// Chroma bins are laid out from the reference frequency (A = 440 Hz),
    /// so bin offsets are counted from A rather than C.
    pub fn from_semitones_above_a(semitones: usize) -> Self {
        Self::from_index(semitones + 9)
    }

    /// Convert to numeric index (0 = C, 1 = C#, ..., 11 = B)
    pub fn to_index(self) -> usize {
        ALL_PITCH_CLASSES
            .iter()
            .position(|p| *p == self)
            .unwrap_or(0)
    }

    /// Key name as written in result files (e.g., "C#", "Eb", "Ab")
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "Eb",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "Ab",
            PitchClass::A => "A",
            PitchClass::As => "Bb",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let index = match s.trim() {
            "C" | "B#" => 0,
            "C#" | "Db" => 1,
            "D" => 2,
            "D#" | "Eb" => 3,
            "E" | "Fb" => 4,
            "F" | "E#" => 5,
            "F#" | "Gb" => 6,
            "G" => 7,
            "G#" | "Ab" => 8,
            "A" => 9,
            "A#" | "Bb" => 10,
            "B" | "Cb" => 11,
            other => return Err(format!("unknown pitch class '{}'", other)),
        };
        Ok(Self::from_index(index))
    }
}

/// Major or Minor scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Analysis results
// =============================================================================

/// Best matching key for one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimate {
    /// Detected tonic
    pub tonic: PitchClass,
    /// Major or Minor
    pub mode: Mode,
    /// Correlation score of the winning template
    pub strength: f32,
    /// (best - second best) / best
    pub relative_strength: f32,
}

/// Outcome of analysing one recording
///
/// Silence is a defined result, not an error: it is produced when no analysis
/// frame carries any chroma energy.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    Key(KeyEstimate),
    Silence,
}

impl KeyOutcome {
    pub fn is_silence(&self) -> bool {
        matches!(self, KeyOutcome::Silence)
    }

    pub fn estimate(&self) -> Option<&KeyEstimate> {
        match self {
            KeyOutcome::Key(estimate) => Some(estimate),
            KeyOutcome::Silence => None,
        }
    }
}

/// Two-field result line: `"<tonic>\t<mode>"` or `"Silence"`
impl fmt::Display for KeyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyOutcome::Key(estimate) => write!(f, "{}\t{}", estimate.tonic, estimate.mode),
            KeyOutcome::Silence => f.write_str("Silence"),
        }
    }
}

/// A recording that went through the analysis pipeline
#[derive(Debug, Clone)]
pub struct AnalyzedRecording {
    /// Input file
    pub path: PathBuf,
    /// Where the result line was written
    pub result_path: PathBuf,
    pub outcome: KeyOutcome,
    pub duration_seconds: f64,
}

// =============================================================================
// Audio buffer types
// =============================================================================

/// Decoded audio samples ready for analysis
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        // Guard against division by zero - use 0 duration for invalid sample rate
        let duration = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// =============================================================================
// Spectral and chroma types
// =============================================================================

/// Spectral peaks of one frame as parallel (frequency, magnitude) sequences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralPeaks {
    /// Peak frequencies in Hz, ascending
    pub frequencies: Vec<f32>,
    /// Linear peak magnitudes, same order as `frequencies`
    pub magnitudes: Vec<f32>,
}

impl SpectralPeaks {
    pub fn new(frequencies: Vec<f32>, magnitudes: Vec<f32>) -> Self {
        debug_assert_eq!(frequencies.len(), magnitudes.len());
        Self {
            frequencies,
            magnitudes,
        }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Iterate over (frequency, magnitude) pairs
    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.magnitudes.iter().copied())
    }
}

/// Circular pitch-class histogram with N non-negative bins
///
/// Index arithmetic is modulo N. Bin 0 sits on the reference frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromaVector(Vec<f32>);

impl ChromaVector {
    /// Wrap raw bin values, clamping negatives to zero
    pub fn new(mut bins: Vec<f32>) -> Self {
        for value in bins.iter_mut() {
            if value.is_nan() || *value < 0.0 {
                *value = 0.0;
            }
        }
        Self(bins)
    }

    pub fn zeros(size: usize) -> Self {
        Self(vec![0.0; size])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bins(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Total energy
    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    /// Largest bin value (0.0 for an empty vector)
    pub fn max(&self) -> f32 {
        self.0.iter().copied().fold(0.0, f32::max)
    }

    /// Index of the first maximum
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &value) in self.0.iter().enumerate() {
            if value > self.0[best] {
                best = i;
            }
        }
        best
    }

    /// Circular rotation towards higher indices: bin `i` moves to `i + k`
    pub fn rotate_up(&mut self, k: usize) {
        if !self.0.is_empty() {
            let k = k % self.0.len();
            self.0.rotate_right(k);
        }
    }

    /// Circular rotation towards lower indices: bin `i` moves to `i - k`
    pub fn rotate_down(&mut self, k: usize) {
        if !self.0.is_empty() {
            let k = k % self.0.len();
            self.0.rotate_left(k);
        }
    }

    /// Scale so the maximum is 1; all-zero vectors are left untouched
    pub fn normalize_max(&mut self) {
        let max = self.max();
        if max > 0.0 {
            for value in self.0.iter_mut() {
                *value /= max;
            }
        }
    }

    /// Element-wise accumulation; both vectors must have the same size
    pub fn accumulate(&mut self, other: &ChromaVector) {
        debug_assert_eq!(self.len(), other.len());
        for (acc, value) in self.0.iter_mut().zip(other.0.iter()) {
            *acc += value;
        }
    }

    pub(crate) fn bins_mut(&mut self) -> &mut [f32] {
        &mut self.0
    }
}

// =============================================================================
// Supported formats
// =============================================================================

/// Audio formats recognized in batch mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Aiff,
    Ogg,
}

impl AudioFormat {
    /// Extension tokens matched against file names
    pub const RECOGNIZED: [(&'static str, AudioFormat); 5] = [
        (".wav", AudioFormat::Wav),
        (".mp3", AudioFormat::Mp3),
        (".flac", AudioFormat::Flac),
        (".aiff", AudioFormat::Aiff),
        (".ogg", AudioFormat::Ogg),
    ];

    /// Detect format from a file name containing one of the recognized tokens
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        Self::RECOGNIZED
            .iter()
            .find(|(token, _)| lower.contains(token))
            .map(|(_, format)| *format)
    }
}
