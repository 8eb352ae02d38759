//! Audio loading using symphonia
//!
//! Decodes a recording to mono f32 samples at the analysis sample rate.
//! Channels are averaged; rubato handles the rate conversion.

use crate::error::{EdmkeyError, Result};
use crate::types::AudioBuffer;
use rubato::{FftFixedInOut, Resampler};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Maximum file size we'll attempt to decode (2GB)
const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Samples per rubato processing chunk
const RESAMPLE_CHUNK: usize = 1024;

/// An opened audio track ready for packet decoding
struct OpenTrack {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
}

/// Decode an audio file to a mono AudioBuffer at `sample_rate`
pub fn decode(path: &Path, sample_rate: u32) -> Result<AudioBuffer> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| EdmkeyError::decode_error(path, format!("Failed to read file metadata: {}", e)))?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(EdmkeyError::decode_error(
            path,
            format!(
                "File too large ({:.1} GB). Maximum supported size is 2 GB.",
                metadata.len() as f64 / (1024.0 * 1024.0 * 1024.0)
            ),
        ));
    }

    let mut track = open_track(path)?;
    debug!(
        "Decoding: {} @ {}Hz, {} channels",
        path.display(),
        track.sample_rate,
        track.channels
    );

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match track.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(EdmkeyError::decode_error(
                    path,
                    format!("Failed to read packet: {}", e),
                ));
            }
        };

        if packet.track_id() != track.track_id {
            continue;
        }

        let decoded = match track.decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                trace!("Skipping corrupted packet: {}", e);
                continue;
            }
            Err(e) => {
                return Err(EdmkeyError::decode_error(path, format!("Decode error: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        mono.extend(to_mono(sample_buf.samples(), track.channels));
    }

    let samples = if track.sample_rate != sample_rate {
        resample(&mono, track.sample_rate, sample_rate)
    } else {
        mono
    };

    debug!(
        "Decoded {} samples ({:.2}s)",
        samples.len(),
        samples.len() as f64 / sample_rate as f64
    );

    Ok(AudioBuffer::new(samples, sample_rate))
}

/// Probe the container and build a decoder for its first audio track
fn open_track(path: &Path) -> Result<OpenTrack> {
    let file = std::fs::File::open(path)
        .map_err(|e| EdmkeyError::decode_error(path, format!("Failed to open file: {}", e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| EdmkeyError::decode_error(path, format!("Failed to probe format: {}", e)))?;

    let format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| EdmkeyError::decode_error(path, "No audio tracks found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.unwrap_or(44100);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2).max(1);

    let decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| EdmkeyError::decode_error(path, format!("Failed to create decoder: {}", e)))?;

    Ok(OpenTrack {
        format,
        decoder,
        track_id,
        sample_rate,
        channels,
    })
}

/// Convert interleaved multi-channel audio to mono by averaging channels
fn to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// FFT-based resampling with anti-aliasing
///
/// Falls back to linear interpolation if rubato cannot be set up for the
/// requested ratio.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let mut resampler =
        match FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 1) {
            Ok(r) => r,
            Err(e) => {
                debug!("Rubato initialization failed ({}), using linear fallback", e);
                return resample_linear(samples, from_rate, to_rate);
            }
        };

    let input_chunk = resampler.input_frames_next();
    let output_chunk = resampler.output_frames_next();
    let ratio = to_rate as f64 / from_rate as f64;
    let mut output = Vec::with_capacity((samples.len() as f64 * ratio).ceil() as usize);

    let mut pos = 0;
    while pos < samples.len() {
        let end = (pos + input_chunk).min(samples.len());
        let mut chunk = samples[pos..end].to_vec();
        chunk.resize(input_chunk, 0.0);

        match resampler.process(&[chunk], None) {
            Ok(resampled) => {
                if let Some(channel) = resampled.first() {
                    // The final chunk is zero padded; keep only its valid share
                    let valid = if end - pos < input_chunk {
                        (((end - pos) as f64 * ratio).ceil() as usize).min(output_chunk)
                    } else {
                        output_chunk
                    };
                    output.extend_from_slice(&channel[..valid.min(channel.len())]);
                }
            }
            Err(e) => {
                debug!("Rubato processing error ({}), linear fallback for the rest", e);
                output.extend(resample_linear(&samples[pos..], from_rate, to_rate));
                break;
            }
        }

        pos += input_chunk;
    }

    output
}

/// Linear interpolation resampler used when rubato is unavailable
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / step) as usize;

    (0..output_len)
        .map(|i| {
            let src = i as f64 * step;
            let idx = src as usize;
            let frac = (src - idx as f64) as f32;
            match (samples.get(idx), samples.get(idx + 1)) {
                (Some(a), Some(b)) => a * (1.0 - frac) + b * frac,
                (Some(a), None) => *a,
                _ => samples[samples.len() - 1],
            }
        })
        .collect()
}
