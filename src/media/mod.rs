//! Caller-side media preparation.
//!
//! Recognition and transcription engines assume a fixed sample shape (single
//! channel at a fixed rate, 16 kHz by default). The container decode itself
//! is an opaque external capability behind [`AudioDecoder`]; the shape
//! conversion (mono mixdown + resample) is done here because its output
//! shape is contractual for the downstream engines. Both run on the calling
//! side; the isolated worker has no access to the decode capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Result;

/// Decoded interleaved PCM as produced by an [`AudioDecoder`].
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples, `channels` values per frame.
    pub samples: Vec<f32>,
}

impl PcmAudio {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Audio prepared for dispatch: mono at the target sample rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedAudio {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl PreparedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Opaque container-decode capability (audio tracks of audio/video files).
///
/// Implementations wrap whatever codec library the embedder ships; failures
/// surface as [`crate::Error::InputPreparation`] on the calling side.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    async fn decode(&self, data: &[u8]) -> Result<PcmAudio>;
}

/// Convert decoded PCM into the fixed shape engines expect.
///
/// Mixes all channels down to mono, then linearly resamples to
/// `target_rate`. Already-conforming input passes through untouched.
pub fn prepare(audio: PcmAudio, target_rate: u32) -> PreparedAudio {
    let mono = mixdown(&audio);

    if audio.sample_rate == target_rate {
        return PreparedAudio {
            sample_rate: target_rate,
            samples: mono,
        };
    }

    PreparedAudio {
        sample_rate: target_rate,
        samples: resample(&mono, audio.sample_rate, target_rate),
    }
}

/// Average interleaved channels into a mono buffer.
fn mixdown(audio: &PcmAudio) -> Vec<f32> {
    let channels = audio.channels.max(1) as usize;
    if channels == 1 {
        return audio.samples.clone();
    }

    audio
        .samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler for mono buffers.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return Vec::new();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conforming_input_passes_through() {
        let audio = PcmAudio {
            sample_rate: 16_000,
            channels: 1,
            samples: vec![0.1, 0.2, 0.3],
        };
        let prepared = prepare(audio.clone(), 16_000);
        assert_eq!(prepared.sample_rate, 16_000);
        assert_eq!(prepared.samples, audio.samples);
    }

    #[test]
    fn stereo_mixes_down_to_channel_average() {
        let audio = PcmAudio {
            sample_rate: 16_000,
            channels: 2,
            samples: vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0],
        };
        let prepared = prepare(audio, 16_000);
        assert_eq!(prepared.samples, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn downsampling_halves_the_buffer() {
        let samples: Vec<f32> = (0..32_000).map(|i| (i % 100) as f32 / 100.0).collect();
        let audio = PcmAudio {
            sample_rate: 32_000,
            channels: 1,
            samples,
        };
        let prepared = prepare(audio, 16_000);
        assert_eq!(prepared.sample_rate, 16_000);
        assert_eq!(prepared.samples.len(), 16_000);
    }

    #[test]
    fn upsampling_interpolates_between_samples() {
        let audio = PcmAudio {
            sample_rate: 8_000,
            channels: 1,
            samples: vec![0.0, 1.0],
        };
        let prepared = prepare(audio, 16_000);
        assert_eq!(prepared.samples.len(), 4);
        assert_eq!(prepared.samples[0], 0.0);
        assert!((prepared.samples[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn duration_accounts_for_channels() {
        let audio = PcmAudio {
            sample_rate: 16_000,
            channels: 2,
            samples: vec![0.0; 32_000],
        };
        assert_eq!(audio.frames(), 16_000);
        assert!((audio.duration_secs() - 1.0).abs() < 1e-9);
        let prepared = prepare(audio, 16_000);
        assert!((prepared.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_stays_empty() {
        let audio = PcmAudio {
            sample_rate: 44_100,
            channels: 2,
            samples: Vec::new(),
        };
        let prepared = prepare(audio, 16_000);
        assert!(prepared.samples.is_empty());
    }
}
