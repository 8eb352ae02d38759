//! Tuning (detuning) correction and chroma gating
//!
//! A recording tuned away from the 440 Hz reference puts its energy maxima
//! between the semitone-centered bins. [`TuningCorrector`] rotates the
//! vector by the smallest amount that puts the maximum bin back on a
//! semitone-centered bin.

use crate::types::ChromaVector;

/// Chroma rotation that re-centers the maximum on a tempered bin
#[derive(Debug, Clone, Copy)]
pub struct TuningCorrector {
    resolution: usize,
}

impl TuningCorrector {
    /// Corrector for vectors of `size` bins
    pub fn new(size: usize) -> Self {
        Self {
            resolution: (size / 12).max(1),
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Max-normalize and rotate a chroma vector
    pub fn correct(&self, chroma: &ChromaVector) -> ChromaVector {
        shift_pcp(chroma, self.resolution)
    }
}

/// Max-normalize `chroma`, then rotate it so its maximum lands on a bin whose
/// index is a multiple of `resolution`
///
/// An all-zero vector is returned unchanged. Offsets up to half a semitone
/// are rotated down, larger ones up, so the maximum moves to the nearest
/// semitone-centered bin.
pub fn shift_pcp(chroma: &ChromaVector, resolution: usize) -> ChromaVector {
    let mut shifted = chroma.clone();
    shifted.normalize_max();
    if resolution <= 1 || shifted.is_empty() {
        return shifted;
    }

    let offset = shifted.argmax() % resolution;
    if offset * 2 > resolution {
        shifted.rotate_up(resolution - offset);
    } else {
        shifted.rotate_down(offset);
    }
    shifted
}

/// Zero every bin below `threshold`; other bins are kept as they are
pub fn pcp_gate(chroma: &ChromaVector, threshold: f32) -> ChromaVector {
    ChromaVector::new(
        chroma
            .bins()
            .iter()
            .map(|&v| if v < threshold { 0.0 } else { v })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike(size: usize, index: usize, value: f32) -> ChromaVector {
        let mut bins = vec![0.0; size];
        bins[index] = value;
        ChromaVector::new(bins)
    }

    #[test]
    fn test_centered_maximum_is_untouched() {
        let chroma = spike(36, 9, 4.0);
        let shifted = shift_pcp(&chroma, 3);
        assert_eq!(shifted.argmax(), 9);
        assert_eq!(shifted.max(), 1.0);
    }

    #[test]
    fn test_maximum_lands_on_tempered_bin() {
        for index in 0..36 {
            let shifted = shift_pcp(&spike(36, index, 2.0), 3);
            assert_eq!(shifted.argmax() % 3, 0, "index {}", index);
        }
    }

    #[test]
    fn test_rotation_picks_nearest_tempered_bin() {
        assert_eq!(shift_pcp(&spike(36, 10, 1.0), 3).argmax(), 9);
        assert_eq!(shift_pcp(&spike(36, 11, 1.0), 3).argmax(), 12);
        assert_eq!(shift_pcp(&spike(36, 35, 1.0), 3).argmax(), 0);

        let fine = TuningCorrector::new(120);
        assert_eq!(fine.resolution(), 10);
        assert_eq!(fine.correct(&spike(120, 14, 1.0)).argmax(), 10);
        assert_eq!(fine.correct(&spike(120, 15, 1.0)).argmax(), 10);
        assert_eq!(fine.correct(&spike(120, 16, 1.0)).argmax(), 20);
    }

    #[test]
    fn test_zero_vector_passes_through() {
        let shifted = shift_pcp(&ChromaVector::zeros(36), 3);
        assert_eq!(shifted, ChromaVector::zeros(36));
    }

    #[test]
    fn test_resolution_one_only_normalizes() {
        let shifted = shift_pcp(&spike(12, 5, 3.0), 1);
        assert_eq!(shifted.argmax(), 5);
        assert_eq!(shifted.max(), 1.0);
    }

    #[test]
    fn test_pcp_gate() {
        let chroma = ChromaVector::new(vec![0.1, 0.5, 0.49, 1.0]);
        let gated = pcp_gate(&chroma, 0.5);
        assert_eq!(gated.bins(), &[0.0, 0.5, 0.0, 1.0]);
    }
}
