//! Segment selection and frame cutting
//!
//! The analysed segment is chosen before framing: optionally skip the first
//! minute, optionally keep only the first N seconds, then trim a percentage
//! off both edges. Frames are cut at a fixed hop and zero padded at the end.

use crate::config::AnalysisConfig;

/// Pick the part of the recording that is analysed
pub fn select_segment<'a>(samples: &'a [f32], sample_rate: u32, config: &AnalysisConfig) -> &'a [f32] {
    let rate = sample_rate as usize;
    let mut segment = samples;

    if config.skip_first_minute && segment.len() > rate * 60 {
        segment = &segment[rate * 60..];
    }

    if config.first_n_seconds > 0 {
        let limit = config.first_n_seconds as usize * rate;
        if segment.len() > limit {
            segment = &segment[..limit];
        }
    }

    if config.avoid_edges_percent > 0.0 {
        let edge = (segment.len() as f64 * config.avoid_edges_percent as f64 / 100.0) as usize;
        segment = &segment[edge..segment.len() - edge];
    }

    segment
}

/// Fixed-size frames over a signal, advancing by a fixed hop
///
/// Yields `len / hop` frames; frame `i` starts at `i * hop` and is padded
/// with zeros where it runs past the end of the signal.
pub struct FrameCutter<'a> {
    samples: &'a [f32],
    frame_size: usize,
    hop_size: usize,
    index: usize,
    count: usize,
}

impl<'a> FrameCutter<'a> {
    pub fn new(samples: &'a [f32], frame_size: usize, hop_size: usize) -> Self {
        let count = if hop_size == 0 { 0 } else { samples.len() / hop_size };
        Self {
            samples,
            frame_size,
            hop_size,
            index: 0,
            count,
        }
    }

    /// Total number of frames this cutter yields
    pub fn frame_count(&self) -> usize {
        self.count
    }
}

impl Iterator for FrameCutter<'_> {
    type Item = Vec<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }

        let start = self.index * self.hop_size;
        let end = (start + self.frame_size).min(self.samples.len());
        let mut frame = Vec::with_capacity(self.frame_size);
        frame.extend_from_slice(&self.samples[start..end]);
        frame.resize(self.frame_size, 0.0);

        self.index += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameCutter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_and_padding() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let frames: Vec<_> = FrameCutter::new(&samples, 4, 3).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(frames[2], vec![6.0, 7.0, 8.0, 9.0]);

        let frames: Vec<_> = FrameCutter::new(&samples, 8, 5).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], vec![5.0, 6.0, 7.0, 8.0, 9.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_short_signal_has_no_frames() {
        let samples = vec![0.5; 10];
        assert_eq!(FrameCutter::new(&samples, 4096, 16384).frame_count(), 0);
    }

    #[test]
    fn test_segment_selection_order() {
        let rate = 10;
        let samples: Vec<f32> = (0..1000).map(|i| i as f32).collect();
        let config = AnalysisConfig {
            skip_first_minute: true,
            first_n_seconds: 20,
            avoid_edges_percent: 10.0,
            ..AnalysisConfig::default()
        };
        let segment = select_segment(&samples, rate, &config);
        // skip 600, keep 200, trim 20 at each edge
        assert_eq!(segment.len(), 160);
        assert_eq!(segment[0], 620.0);
    }

    #[test]
    fn test_skip_first_minute_ignores_short_recordings() {
        let samples = vec![0.0; 500];
        let config = AnalysisConfig {
            skip_first_minute: true,
            ..AnalysisConfig::default()
        };
        assert_eq!(select_segment(&samples, 10, &config).len(), 500);
    }
}
