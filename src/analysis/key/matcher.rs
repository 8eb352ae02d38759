//! Key profile correlation
//!
//! Every template curve of a profile family is expanded to the chroma
//! resolution and correlated against the aggregate chroma at each of the N
//! circular shifts. The best (curve, shift) pair gives mode and tonic.
//!
//! Ties are resolved deterministically:
//! - within one curve the lowest shift wins (lowest tonic from A);
//! - across curves major wins over minor, and the `other` curve only wins
//!   when it is strictly better than both.

use crate::analysis::key::profiles::{KeyProfile, CURVE_LENGTH};
use crate::error::{EdmkeyError, Result};
use crate::types::{ChromaVector, KeyEstimate, Mode, PitchClass};
use std::path::PathBuf;

/// A template curve at chroma resolution, with cached statistics
#[derive(Debug, Clone)]
struct Template {
    mode: Mode,
    curve: Vec<f64>,
    mean: f64,
    norm: f64,
}

impl Template {
    fn new(mode: Mode, semitone_curve: &[f32], size: usize) -> Self {
        let curve: Vec<f64> = interpolate_profile(semitone_curve, size)
            .into_iter()
            .map(f64::from)
            .collect();
        let (mean, norm) = centered_stats(&curve);
        Self {
            mode,
            curve,
            mean,
            norm,
        }
    }
}

/// Best shift of one template
#[derive(Debug, Clone, Copy)]
struct Candidate {
    template: usize,
    shift: usize,
    score: f64,
}

/// Correlation-based key matcher for one profile family
#[derive(Debug, Clone)]
pub struct KeyProfileMatcher {
    profile: KeyProfile,
    size: usize,
    templates: Vec<Template>,
}

impl KeyProfileMatcher {
    /// Build a matcher for chroma vectors of `size` bins
    pub fn new(profile: &KeyProfile, size: usize) -> Result<Self> {
        if size < CURVE_LENGTH || size % CURVE_LENGTH != 0 {
            return Err(EdmkeyError::ConfigError(format!(
                "chroma size must be a positive multiple of 12, got {}",
                size
            )));
        }

        let mut templates = vec![
            Template::new(Mode::Major, &profile.major, size),
            Template::new(Mode::Minor, &profile.minor, size),
        ];
        if let Some(other) = &profile.other {
            templates.push(Template::new(Mode::Minor, other, size));
        }

        Ok(Self {
            profile: profile.clone(),
            size,
            templates,
        })
    }

    pub fn profile_name(&self) -> &str {
        &self.profile.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Estimate the key of an aggregate chroma vector
    ///
    /// Vectors of a different resolution are matched against templates
    /// re-expanded to their size.
    pub fn estimate(&self, chroma: &ChromaVector) -> Result<KeyEstimate> {
        if chroma.is_empty() {
            return Err(EdmkeyError::AnalysisError {
                path: PathBuf::new(),
                reason: "cannot match an empty chroma vector".to_string(),
            });
        }
        if chroma.len() != self.size {
            return Self::new(&self.profile, chroma.len())?.estimate(chroma);
        }

        let bins: Vec<f64> = chroma.bins().iter().map(|&v| f64::from(v)).collect();
        let (mean, norm) = centered_stats(&bins);
        let n = self.size;

        let mut scores: Vec<Vec<f64>> = Vec::with_capacity(self.templates.len());
        let mut best: Option<Candidate> = None;

        for (index, template) in self.templates.iter().enumerate() {
            let row: Vec<f64> = (0..n)
                .map(|shift| correlation(&bins, mean, norm, template, shift))
                .collect();

            let mut local = Candidate {
                template: index,
                shift: 0,
                score: row[0],
            };
            for (shift, &score) in row.iter().enumerate().skip(1) {
                if score > local.score {
                    local = Candidate {
                        template: index,
                        shift,
                        score,
                    };
                }
            }

            if best.map_or(true, |b| local.score > b.score) {
                best = Some(local);
            }
            scores.push(row);
        }

        let best = best.ok_or_else(|| EdmkeyError::AnalysisError {
            path: PathBuf::new(),
            reason: format!("profile '{}' has no templates", self.profile.name),
        })?;

        let second = scores
            .iter()
            .enumerate()
            .flat_map(|(t, row)| row.iter().enumerate().map(move |(s, &v)| (t, s, v)))
            .filter(|&(t, s, _)| (t, s) != (best.template, best.shift))
            .map(|(_, _, v)| v)
            .fold(f64::NEG_INFINITY, f64::max);

        let relative_strength = if best.score > 0.0 && second.is_finite() {
            (best.score - second) / best.score
        } else {
            0.0
        };

        Ok(KeyEstimate {
            tonic: PitchClass::from_semitones_above_a(best.shift * 12 / n),
            mode: self.templates[best.template].mode,
            strength: best.score as f32,
            relative_strength: relative_strength as f32,
        })
    }
}

/// Pearson correlation between the chroma and a template rotated by `shift`
fn correlation(bins: &[f64], mean: f64, norm: f64, template: &Template, shift: usize) -> f64 {
    if norm == 0.0 || template.norm == 0.0 {
        return 0.0;
    }
    let n = bins.len();
    let covariance: f64 = bins
        .iter()
        .enumerate()
        .map(|(i, &c)| (c - mean) * (template.curve[(i + n - shift) % n] - template.mean))
        .sum();
    covariance / (norm * template.norm)
}

/// Mean and norm of the mean-centered values
fn centered_stats(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let norm = values
        .iter()
        .map(|v| (v - mean) * (v - mean))
        .sum::<f64>()
        .sqrt();
    (mean, norm)
}

/// Expand a 12-value curve to `size` bins
///
/// Bin `i * R` holds the value of semitone `i`; the bins in between are
/// linearly interpolated towards the next semitone (wrapping after the 12th).
pub fn interpolate_profile(curve: &[f32], size: usize) -> Vec<f32> {
    let semitones = curve.len();
    if semitones == 0 || size == 0 {
        return Vec::new();
    }
    let resolution = (size / semitones).max(1);

    let mut expanded = Vec::with_capacity(semitones * resolution);
    for i in 0..semitones {
        let from = curve[i];
        let to = curve[(i + 1) % semitones];
        let step = (to - from) / resolution as f32;
        for j in 0..resolution {
            expanded.push(from + j as f32 * step);
        }
    }
    expanded
}
