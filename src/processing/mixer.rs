use crate::models::config::MixMode;
use crate::models::error::CaptureError;
use crate::models::frame::{Frame, SourceId, SynchronizedPair};

/// Combines a synchronized, gain-adjusted pair into one output frame.
///
/// `Mixed` mode attenuates proactively: each source is weighted by the
/// mix ratio before summing (`mic·r + system·(1−r)`), so with the default
/// ratio two full-scale inputs sum to exactly full scale, and the final
/// saturating cast only acts on rounding. `StereoSplit` interleaves the
/// sources onto separate channels with no summation at all.
#[derive(Debug, Clone)]
pub struct Mixer {
    mode: MixMode,
    output_channels: u16,
    mix_ratio: f32,
}

impl Mixer {
    pub fn new(mode: MixMode, output_channels: u16, mix_ratio: f32) -> Self {
        let output_channels = match mode {
            MixMode::StereoSplit => 2,
            MixMode::Mixed => output_channels,
        };
        Self {
            mode,
            output_channels,
            mix_ratio,
        }
    }

    pub fn output_channels(&self) -> u16 {
        self.output_channels
    }

    /// Compose the pair into an interleaved output frame.
    ///
    /// Fails with `FormatMismatch` when the pair violates its invariant
    /// (differing rates or frame counts) — that is a programming error
    /// upstream, not a runtime condition.
    pub fn combine(&self, pair: SynchronizedPair) -> Result<Frame, CaptureError> {
        if pair.mic.sample_rate != pair.system.sample_rate {
            return Err(CaptureError::FormatMismatch(format!(
                "pair rates differ: mic {} vs system {}",
                pair.mic.sample_rate, pair.system.sample_rate
            )));
        }
        if pair.mic.frame_count() != pair.system.frame_count() {
            return Err(CaptureError::FormatMismatch(format!(
                "pair frame counts differ: mic {} vs system {}",
                pair.mic.frame_count(),
                pair.system.frame_count()
            )));
        }

        let frame_count = pair.mic.frame_count();
        let samples = match self.mode {
            MixMode::StereoSplit => {
                let mut out = Vec::with_capacity(frame_count * 2);
                for i in 0..frame_count {
                    out.push(pair.mic.samples[i]);
                    out.push(pair.system.samples[i]);
                }
                out
            }
            MixMode::Mixed => {
                let r = self.mix_ratio;
                let channels = self.output_channels as usize;
                let mut out = Vec::with_capacity(frame_count * channels);
                for i in 0..frame_count {
                    let mixed = pair.mic.samples[i] as f32 * r
                        + pair.system.samples[i] as f32 * (1.0 - r);
                    let sample = mixed
                        .round()
                        .clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                    for _ in 0..channels {
                        out.push(sample);
                    }
                }
                out
            }
        };

        Ok(Frame {
            source: SourceId::Mix,
            sample_rate: pair.mic.sample_rate,
            channels: self.output_channels,
            sequence: pair.mic.sequence,
            timestamp_ns: pair.window_ns,
            samples,
        })
    }
}

/// Average all channels of an interleaved block down to mono.
pub fn downmix_average(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let ch = channels as usize;
    let frames = samples.len() / ch;
    let mut mono = Vec::with_capacity(frames);
    for f in 0..frames {
        let sum: i32 = samples[f * ch..(f + 1) * ch].iter().map(|&s| s as i32).sum();
        mono.push((sum / ch as i32) as i16);
    }
    mono
}

/// Take only the left channel of an interleaved block.
///
/// Used for the loopback side: averaging L and R of already-rendered
/// audio can cancel out-of-phase content and confuse the echo canceller.
pub fn left_channel(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples.iter().step_by(channels as usize).copied().collect()
}
